//! Destino dos logs do núcleo
//!
//! Os macros de `core::logging` emitem através das funções `emit_*` deste
//! módulo. O kernel hospedeiro registra um `LogSink` (normalmente a serial)
//! uma única vez no boot; antes disso toda saída é descartada.

use spin::{Mutex, Once};

/// Destino de texto de log.
pub trait LogSink: Send + Sync {
    fn write_str(&self, s: &str);
}

static SINK: Once<&'static dyn LogSink> = Once::new();

/// Registra o destino global de logs.
///
/// Apenas a primeira chamada tem efeito. Retorna `false` se já havia um
/// destino registrado.
pub fn install_sink(sink: &'static dyn LogSink) -> bool {
    let mut installed = false;
    SINK.call_once(|| {
        installed = true;
        sink
    });
    installed
}

#[inline]
pub fn emit_str(s: &str) {
    if let Some(sink) = SINK.get() {
        sink.write_str(s);
    }
}

/// Emite `0x` seguido de 16 dígitos hexadecimais.
pub fn emit_hex(value: u64) {
    let Some(sink) = SINK.get() else {
        return;
    };

    let mut buf = [0u8; 18];
    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..16 {
        let nibble = ((value >> (60 - i * 4)) & 0xF) as u8;
        buf[2 + i] = nibble_to_ascii(nibble);
    }

    if let Ok(s) = core::str::from_utf8(&buf) {
        sink.write_str(s);
    }
}

#[inline]
pub fn emit_nl() {
    emit_str("\n");
}

#[inline]
const fn nibble_to_ascii(n: u8) -> u8 {
    if n < 10 {
        b'0' + n
    } else {
        b'a' + (n - 10)
    }
}

// =============================================================================
// BUFFER EM MEMÓRIA
// =============================================================================

const MEMORY_LOG_CAPACITY: usize = 16 * 1024;

/// Destino de log em memória.
///
/// Usado para capturar logs antes da serial estar pronta e pelos testes.
/// Quando cheio descarta a metade mais antiga.
pub struct MemorySink {
    inner: Mutex<MemoryLog>,
}

struct MemoryLog {
    buf: [u8; MEMORY_LOG_CAPACITY],
    len: usize,
}

impl MemorySink {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryLog {
                buf: [0; MEMORY_LOG_CAPACITY],
                len: 0,
            }),
        }
    }

    /// Verifica se `needle` aparece no conteúdo retido.
    pub fn contains(&self, needle: &str) -> bool {
        let log = self.inner.lock();
        let hay = &log.buf[..log.len];
        let needle = needle.as_bytes();
        if needle.is_empty() {
            return true;
        }
        hay.windows(needle.len()).any(|w| w == needle)
    }

    pub fn clear(&self) {
        self.inner.lock().len = 0;
    }
}

impl LogSink for MemorySink {
    fn write_str(&self, s: &str) {
        let mut log = self.inner.lock();
        let bytes = s.as_bytes();
        if bytes.len() > MEMORY_LOG_CAPACITY {
            return;
        }
        if log.len + bytes.len() > MEMORY_LOG_CAPACITY {
            let keep = MEMORY_LOG_CAPACITY / 2;
            let end = log.len;
            let drop = end.saturating_sub(keep);
            log.buf.copy_within(drop..end, 0);
            log.len -= drop;
            if log.len + bytes.len() > MEMORY_LOG_CAPACITY {
                log.len = 0;
            }
        }
        let start = log.len;
        log.buf[start..start + bytes.len()].copy_from_slice(bytes);
        log.len += bytes.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_recent_text() {
        let sink = MemorySink::new();
        sink.write_str("(Sched) ola");
        assert!(sink.contains("ola"));
        assert!(!sink.contains("tchau"));

        let filler = [b'x'; 1024];
        let filler = core::str::from_utf8(&filler).unwrap();
        for _ in 0..20 {
            sink.write_str(filler);
        }
        sink.write_str("(Sched) fim");
        assert!(sink.contains("fim"));
        assert!(!sink.contains("ola"));
    }

    #[test]
    fn hex_digits() {
        assert_eq!(nibble_to_ascii(0), b'0');
        assert_eq!(nibble_to_ascii(9), b'9');
        assert_eq!(nibble_to_ascii(0xA), b'a');
        assert_eq!(nibble_to_ascii(0xF), b'f');
    }
}
