//! Tradeoff constraints between two competing trait shares.

use crate::config::GeneticsConfig;
use crate::organism::Role;
use serde::{Deserialize, Serialize};

/// Power-law budget constraint `x^p + y^p <= budget^p`.
///
/// An exponent below one gives a convex frontier (herbivore lifespan vs
/// speed); above one, a concave frontier (carnivore speed vs stealth).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tradeoff {
    pub exponent: f64,
    pub budget: f64,
}

impl Tradeoff {
    pub fn new(exponent: f64) -> Self {
        Self {
            exponent,
            budget: 1.0,
        }
    }

    /// Constraint configured for a species
    pub fn for_role(role: Role, config: &GeneticsConfig) -> Self {
        match role {
            Role::Herbivore => Self::new(config.herbivore_tradeoff),
            Role::Carnivore => Self::new(config.carnivore_tradeoff),
        }
    }

    /// Check whether the pair lies inside the frontier
    #[inline]
    pub fn holds(&self, x: f64, y: f64) -> bool {
        let p = self.exponent;
        x.max(0.0).powf(p) + y.max(0.0).powf(p) <= self.budget.powf(p) + 1e-12
    }

    pub fn is_convex(&self) -> bool {
        self.exponent < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convex_tradeoff() {
        let t = Tradeoff::new(0.7);
        assert!(t.is_convex());
        assert!(t.holds(0.3, 0.1));
        assert!(t.holds(1.0, 0.0));
        // Splitting the budget evenly is penalised under a convex frontier
        assert!(!t.holds(0.5, 0.5));
    }

    #[test]
    fn test_concave_tradeoff() {
        let t = Tradeoff::new(1.3);
        assert!(!t.is_convex());
        assert!(t.holds(0.5, 0.5));
        assert!(!t.holds(0.6, 0.6));
    }

    #[test]
    fn test_for_role_uses_config() {
        let config = GeneticsConfig::default();
        assert_eq!(Tradeoff::for_role(Role::Herbivore, &config).exponent, 0.7);
        assert_eq!(Tradeoff::for_role(Role::Carnivore, &config).exponent, 1.3);
    }
}
