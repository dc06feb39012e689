//! Interface Abstrata de Memória (HAL).
//! O escalonador não conhece tabelas de páginas: pede e devolve pilhas e
//! espaços de endereçamento por este trait.

use crate::mm::aspace::AddressSpace;
use crate::mm::stack::StackRegion;

pub trait MemoryOps: Send + Sync {
    /// Aloca uma pilha de kernel de `size` bytes (já normalizado).
    fn allocate_stack(&self, size: usize) -> Option<StackRegion>;

    /// Devolve uma pilha obtida de `allocate_stack`.
    fn free_stack(&self, stack: StackRegion);

    /// Cria um espaço de endereçamento para um novo processo.
    fn create_address_space(&self, user_mode: bool) -> Option<AddressSpace>;

    /// Carrega `aspace` no núcleo atual (CR3 em x86_64).
    fn switch_address_space(&self, aspace: AddressSpace);

    /// Destrói um espaço de endereçamento que nenhum núcleo tem carregado.
    fn destroy_address_space(&self, aspace: AddressSpace);

    /// A faixa `[addr, addr + len)` está mapeada e acessível ao processo
    /// atual? Usado para ler parâmetros de syscalls.
    fn can_access_user(&self, addr: u64, len: usize) -> bool;
}
