//! Tipos fundamentais do sistema

/// Process ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Pid(pub u32);

impl Pid {
    /// Processo do kernel: dono das threads idle e de todas as threads de kernel.
    pub const KERNEL: Pid = Pid(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Thread ID
///
/// Único entre todas as threads vivas ou recém-mortas. O valor 0 é reservado
/// e nunca é atribuído.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Tid(pub u32);

impl Tid {
    pub const NONE: Tid = Tid(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}
