use super::DomainError;

/// Position of a section within its homework, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionOrder(u8);

impl SectionOrder {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 20;

    pub fn new(value: u8) -> Result<Self, DomainError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidSectionOrder(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SectionOrder {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SectionOrder> for u8 {
    fn from(value: SectionOrder) -> Self {
        value.value()
    }
}

#[cfg(test)]
mod tests {
    use super::SectionOrder;

    #[test]
    fn bounds_are_accepted() {
        assert_eq!(SectionOrder::new(1).expect("1 should be valid").value(), 1);
        assert_eq!(
            SectionOrder::new(20).expect("20 should be valid").value(),
            20
        );
    }

    #[test]
    fn zero_is_rejected() {
        let err = SectionOrder::new(0).expect_err("0 should be rejected");

        assert_eq!(
            err.to_string(),
            "invalid section order: 0. order must be in [1, 20]"
        );
    }

    #[test]
    fn above_max_is_rejected() {
        assert!(SectionOrder::new(21).is_err());
    }
}
