//! Persisted configuration bytes.

use crate::state::OperatingState;

/// Durable single-byte cells that survive power loss.
pub trait ByteStore {
    type Error;

    fn read_byte(&mut self, addr: u16) -> Result<u8, Self::Error>;
    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), Self::Error>;
}

impl<T: ByteStore + ?Sized> ByteStore for &mut T {
    type Error = T::Error;

    fn read_byte(&mut self, addr: u16) -> Result<u8, Self::Error> {
        (**self).read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), Self::Error> {
        (**self).write_byte(addr, value)
    }
}

/// Address outside of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRange;

/// RAM-backed store, e.g. a mirror of a flash page.
impl<const N: usize> ByteStore for [u8; N] {
    type Error = OutOfRange;

    fn read_byte(&mut self, addr: u16) -> Result<u8, Self::Error> {
        self.get(addr as usize).copied().ok_or(OutOfRange)
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), Self::Error> {
        let cell = self.get_mut(addr as usize).ok_or(OutOfRange)?;
        *cell = value;
        Ok(())
    }
}

/// Layout of the persisted bytes.
pub struct Config<S> {
    store: S,
}

impl<S: ByteStore> Config<S> {
    pub const RESERVED_ADDR: u16 = 0;
    pub const STATE_ADDR: u16 = 1;

    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Desired operating state. Anything but OFF/SP/DP (a blank store on first boot, a failed
    /// read) reads back as OFF.
    pub fn state(&mut self) -> OperatingState {
        match self.store.read_byte(Self::STATE_ADDR) {
            Ok(byte) => match OperatingState::from_u8(byte) {
                Some(state) if state != OperatingState::Keep => state,
                _ => OperatingState::Off,
            },
            Err(_) => {
                warn!("config: state read failed");
                OperatingState::Off
            }
        }
    }

    /// Persist the desired state. KEEP is not a desired state and is ignored; unchanged values
    /// are not rewritten.
    pub fn set_state(&mut self, state: OperatingState) {
        if state == OperatingState::Keep {
            warn!("config: refusing to persist KEEP");
            return;
        }
        if matches!(self.store.read_byte(Self::STATE_ADDR), Ok(byte) if byte == state.as_u8()) {
            return;
        }
        match self.store.write_byte(Self::STATE_ADDR, state.as_u8()) {
            Ok(()) => debug!("config: state = {}", state),
            Err(_) => warn!("config: state write failed"),
        }
    }
}
