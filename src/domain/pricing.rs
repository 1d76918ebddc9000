/// Coarse price band shown next to the ticket price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriceLevel(u8);

impl PriceLevel {
    pub const MAX: u8 = 4;

    pub fn for_price(price: f64) -> Self {
        let level = if price <= 30.0 {
            1
        } else if price <= 60.0 {
            2
        } else if price <= 100.0 {
            3
        } else {
            4
        };
        Self(level)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// One flag per band, `true` for bands at or below this level.
    pub fn bands(self) -> Vec<bool> {
        (1..=Self::MAX).map(|band| band <= self.0).collect()
    }
}

/// Render a price without a trailing `.0` for whole amounts.
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("${price:.0}")
    } else {
        format!("${price:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(PriceLevel::for_price(0.0).get(), 1);
        assert_eq!(PriceLevel::for_price(30.0).get(), 1);
        assert_eq!(PriceLevel::for_price(30.5).get(), 2);
        assert_eq!(PriceLevel::for_price(60.0).get(), 2);
        assert_eq!(PriceLevel::for_price(100.0).get(), 3);
        assert_eq!(PriceLevel::for_price(250.0).get(), 4);
    }

    #[test]
    fn bands_fill_up_to_level() {
        assert_eq!(
            PriceLevel::for_price(45.0).bands(),
            vec![true, true, false, false]
        );
    }

    #[test]
    fn whole_prices_drop_cents() {
        assert_eq!(format_price(25.0), "$25");
        assert_eq!(format_price(12.5), "$12.50");
    }
}
