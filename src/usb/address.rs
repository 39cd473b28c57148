const MAX_ADDRESS: u8 = 127;

/// A bus address, 0 being the default address of a device not yet addressed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(u8);

impl Address {
    pub const DEFAULT: Address = Address(0);
}

impl From<Address> for u8 {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

/// Free addresses as a bitmap, bit N set when address N can be handed out.
/// Address 0 is never part of the pool.
#[derive(Clone, Debug)]
pub struct AddressPool {
    pool: u128,
}

impl Default for AddressPool {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressPool {
    pub fn new() -> Self {
        Self {
            pool: !1,
        }
    }

    pub fn take_next(&mut self) -> Option<Address> {
        let next = self.pool.trailing_zeros();
        if next <= MAX_ADDRESS as u32 {
            self.pool &= !(1u128 << next);
            return Some(Address(next as u8));
        }
        None
    }

    pub fn put_back(&mut self, addr: Address) {
        if addr.0 != 0 {
            self.pool |= 1u128 << addr.0
        }
    }
}
