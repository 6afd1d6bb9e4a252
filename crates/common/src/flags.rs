//! Member and type access flags.

use bitflags::bitflags;

bitflags! {
    /// Access flags of the compiled format, one bit per modifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u16 {
        const PUBLIC     = 0x0001;
        const PRIVATE    = 0x0002;
        const PROTECTED  = 0x0004;
        const STATIC     = 0x0008;
        const FINAL      = 0x0010;
        const INTERFACE  = 0x0200;
        const ABSTRACT   = 0x0400;
        const SYNTHETIC  = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM       = 0x4000;
    }
}

impl AccessFlags {
    pub fn is_private(self) -> bool {
        self.contains(AccessFlags::PRIVATE)
    }

    pub fn is_static(self) -> bool {
        self.contains(AccessFlags::STATIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_queries() {
        let f = AccessFlags::PRIVATE | AccessFlags::FINAL;
        assert!(f.is_private());
        assert!(!f.is_static());
        assert!(AccessFlags::from_bits_retain(0x0008).is_static());
    }
}
