//! Club definitions.

/// A club in the bag. Read-only while a shot is in progress.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Club {
    pub name: String,
    /// Full-power reference distance (m)
    pub max_distance: f64,
    /// Loft (deg)
    pub loft_deg: f64,
    /// Dispersion multiplier; higher is harder to hit straight
    pub difficulty: f64,
}

impl Club {
    pub fn new(name: &str, max_distance: f64, loft_deg: f64, difficulty: f64) -> Self {
        Self { name: name.to_string(), max_distance, loft_deg, difficulty }
    }

    pub fn loft_rad(&self) -> f64 {
        self.loft_deg.to_radians()
    }
}

/// The standard bag, longest club first.
pub fn default_bag() -> Vec<Club> {
    vec![
        Club::new("Driver", 250.0, 10.5, 1.5),
        Club::new("3 Wood", 215.0, 15.0, 1.3),
        Club::new("5 Iron", 180.0, 24.0, 1.1),
        Club::new("7 Iron", 155.0, 32.0, 1.0),
        Club::new("9 Iron", 130.0, 41.0, 0.9),
        Club::new("Pitching Wedge", 110.0, 46.0, 0.8),
        Club::new("Sand Wedge", 80.0, 56.0, 0.7),
        Club::new("Putter", 30.0, 3.0, 0.3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bag_is_ordered_by_distance() {
        let bag = default_bag();
        assert_eq!(bag[0].name, "Driver");
        assert!(bag.windows(2).all(|w| w[0].max_distance > w[1].max_distance));
    }

    #[test]
    fn loft_in_radians() {
        let club = Club::new("Test", 100.0, 90.0, 1.0);
        assert!((club.loft_rad() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}
