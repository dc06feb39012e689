//! Handle opaco para userspace
//!
//! Userspace nunca vê ponteiros nem índices crus de tabelas do núcleo,
//! apenas um valor de 32 bits: índice (16 bits baixos) + geração (16 bits
//! altos). A geração muda a cada reutilização do slot, então um handle antigo
//! para um slot reciclado é rejeitado.

/// Handle é índice + generation
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    pub const INVALID: Self = Self(u32::MAX);

    pub const fn new(index: u16, generation: u16) -> Self {
        Self((generation as u32) << 16 | index as u32)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn index(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub const fn generation(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != Self::INVALID.0
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}
