use crate::usb::address::{Address, AddressPool};
use crate::usb::{DeviceDescriptor, Endpoint};

/// What the host knows about one device on the bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceRecord {
    pub address: Address,
    /// Control endpoint parameters
    pub endpoint: Endpoint,
    pub descriptor: Option<DeviceDescriptor>,
}

impl DeviceRecord {
    fn template() -> Self {
        Self {
            address: Address::DEFAULT,
            endpoint: Endpoint::default_pipe(),
            descriptor: None,
        }
    }

    pub fn vid_pid(&self) -> Option<(u16, u16)> {
        self.descriptor.map(|desc| (desc.id_vendor, desc.id_product))
    }
}

/// Record 0 is the default pipe template filled during enumeration,
/// record 1 the addressed device cloned from it.
#[derive(Clone, Debug)]
pub struct DeviceTable {
    template: DeviceRecord,
    device: Option<DeviceRecord>,
    addr_pool: AddressPool,
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTable {
    pub fn new() -> Self {
        Self {
            template: DeviceRecord::template(),
            device: None,
            addr_pool: AddressPool::new(),
        }
    }

    /// Forget the device, give back its address and rewind the template to DATA0 / 8 bytes.
    pub fn reset(&mut self) {
        if let Some(device) = self.device.take() {
            self.addr_pool.put_back(device.address);
        }
        self.template = DeviceRecord::template();
    }

    pub fn template(&self) -> &DeviceRecord {
        &self.template
    }

    pub fn template_mut(&mut self) -> &mut DeviceRecord {
        &mut self.template
    }

    pub fn next_address(&mut self) -> Option<Address> {
        self.addr_pool.take_next()
    }

    pub fn release_address(&mut self, addr: Address) {
        self.addr_pool.put_back(addr)
    }

    /// Populate record 1 from the template under its newly assigned address.
    pub fn insert_device(&mut self, address: Address) -> &DeviceRecord {
        let mut record = self.template;
        record.address = address;
        self.device.insert(record)
    }

    pub fn device(&self) -> Option<&DeviceRecord> {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> Option<&mut DeviceRecord> {
        self.device.as_mut()
    }

    /// The addressed device, once its descriptor is known.
    pub fn active(&self) -> Option<&DeviceRecord> {
        self.device.as_ref().filter(|rec| rec.descriptor.is_some())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_copies_template_and_reset_recycles_address() {
        let mut table = DeviceTable::new();
        table.template_mut().descriptor = Some(DeviceDescriptor { id_vendor: 1, id_product: 2, ..Default::default() });
        table.template_mut().endpoint.max_packet_size = 64;

        let addr = table.next_address().unwrap();
        let rec = *table.insert_device(addr);
        assert_eq!(u8::from(rec.address), 1);
        assert_eq!(rec.endpoint.max_packet_size, 64);
        assert_eq!(table.active().and_then(|r| r.vid_pid()), Some((1, 2)));

        table.reset();
        assert!(table.device().is_none());
        assert_eq!(table.template().endpoint.max_packet_size, 8);
        assert_eq!(table.next_address(), Some(addr));
    }
}
