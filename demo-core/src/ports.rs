use serde::{Deserialize, Serialize};
use std::{collections::HashSet, ops::RangeInclusive};

pub type Port = u16;

/// Tracks which listener ports are taken.
///
/// Any port may be reserved; `allocate` only hands out ports from the
/// fallback range.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PortAllocator {
    range: RangeInclusive<Port>,
    used_ports: HashSet<Port>,
}

impl PortAllocator {
    pub fn new(start: Port, end: Port) -> Self {
        Self::new_from_range(start..=end)
    }

    pub fn new_from_range(range: RangeInclusive<Port>) -> Self {
        Self {
            range,
            used_ports: HashSet::new(),
        }
    }

    /// Marks `port` as taken. Returns false if it already was.
    pub fn reserve(&mut self, port: Port) -> bool {
        self.used_ports.insert(port)
    }

    pub fn is_used(&self, port: Port) -> bool {
        self.used_ports.contains(&port)
    }

    /// Takes the lowest free port of the fallback range.
    pub fn allocate(&mut self) -> Option<Port> {
        for port in self.range.clone() {
            if !self.used_ports.contains(&port) {
                self.used_ports.insert(port);
                return Some(port);
            }
        }
        None
    }

    pub fn release(&mut self, port: Port) {
        self.used_ports.remove(&port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_detects_collision() {
        let mut ports = PortAllocator::new(8100, 8101);
        assert!(ports.reserve(8002));
        assert!(!ports.reserve(8002));
        assert!(ports.is_used(8002));
    }

    #[test]
    fn test_allocate_skips_reserved_and_exhausts() {
        let mut ports = PortAllocator::new(8100, 8101);
        ports.reserve(8100);
        assert_eq!(ports.allocate(), Some(8101));
        assert_eq!(ports.allocate(), None);
        ports.release(8100);
        assert_eq!(ports.allocate(), Some(8100));
    }
}
