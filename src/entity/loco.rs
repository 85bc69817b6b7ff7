//! Locomotive entity

use crate::attribute::Attribute;
use crate::config::LocoConfig;

/// A locomotive throttle mirrored from the server
#[derive(Debug, Clone)]
pub struct Loco {
    address: u32,
    name: String,
    speed_steps: u16,
    delta: Option<f32>,
    favorites: Vec<usize>,
    momentary: Vec<usize>,
    pub speed: Attribute,
    pub forward: Attribute,
    pub functions: Vec<Attribute>,
    pub color: Attribute,
    pub slot: Attribute,
}

impl Loco {
    pub fn from_config(config: &LocoConfig) -> Self {
        let functions = (0..config.functions)
            .map(|i| Attribute::new(format!("F{}", i), false))
            .collect();
        let favorites = config
            .favorites
            .clone()
            .unwrap_or_else(|| (0..4).collect::<Vec<_>>())
            .into_iter()
            .filter(|f| *f < config.functions)
            .collect();

        Self {
            address: config.address,
            name: config
                .name
                .clone()
                .unwrap_or_else(|| config.address.to_string()),
            speed_steps: config.speed_steps.max(1),
            delta: config.delta,
            favorites,
            momentary: config.momentary.clone(),
            speed: Attribute::new("speed", 0.0f32),
            forward: Attribute::new("forward", true),
            functions,
            color: Attribute::new("color", "white"),
            slot: Attribute::new("slot", -1i64),
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoder step for one detent
    pub fn step(&self) -> f32 {
        self.delta
            .unwrap_or_else(|| 1.0 / f32::from(self.speed_steps))
    }

    pub fn speed_value(&self) -> f32 {
        self.speed.as_float().unwrap_or(0.0)
    }

    pub fn is_forward(&self) -> bool {
        self.forward.as_bool().unwrap_or(true)
    }

    pub fn function(&self, index: usize) -> Option<bool> {
        self.functions.get(index).and_then(Attribute::as_bool)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Function indices ranked for the per-column pad strip
    pub fn favorites(&self) -> &[usize] {
        &self.favorites
    }

    pub fn is_momentary(&self, index: usize) -> bool {
        self.momentary.contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: u32) -> LocoConfig {
        serde_yaml::from_str(&format!("address: {}", address)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let loco = Loco::from_config(&config(3));
        assert_eq!(loco.name(), "3");
        assert_eq!(loco.function_count(), 29);
        assert_eq!(loco.favorites(), &[0, 1, 2, 3]);
        assert!((loco.step() - 1.0 / 126.0).abs() < f32::EPSILON);
        assert!(loco.is_forward());
    }

    #[test]
    fn test_favorites_are_clamped_to_function_count() {
        let cfg: LocoConfig =
            serde_yaml::from_str("address: 7\nfunctions: 4\nfavorites: [3, 9, 1]\ndelta: 0.05")
                .unwrap();
        let loco = Loco::from_config(&cfg);
        assert_eq!(loco.favorites(), &[3, 1]);
        assert_eq!(loco.step(), 0.05);
        assert!(!loco.is_momentary(2));
    }
}
