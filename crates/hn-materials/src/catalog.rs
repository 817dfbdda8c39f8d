//! Built-in material catalog.
//!
//! Fits are in the units the façade collector drivers use: temperature in
//! °C, density in kg/m³, specific heat in kJ/(kg·K), conductivity in
//! W/(m·K), dynamic viscosity in Pa·s.

use crate::material::{Material, Phase};
use crate::property::{Property, PropertyFn};

/// Temperature variable the catalog fits are written against.
pub const TEMPERATURE: &str = "T";

const WATER_DOMAIN: (f64, f64) = (0.0, 100.0);
const AIR_DOMAIN: (f64, f64) = (-40.0, 150.0);

fn water_fit(coeffs: &[f64]) -> PropertyFn {
    PropertyFn::polynomial(TEMPERATURE, coeffs).with_domain(WATER_DOMAIN.0, WATER_DOMAIN.1)
}

fn air_fit(coeffs: &[f64]) -> PropertyFn {
    PropertyFn::polynomial(TEMPERATURE, coeffs).with_domain(AIR_DOMAIN.0, AIR_DOMAIN.1)
}

pub fn water() -> Material {
    Material::new("water", Phase::Liquid)
        .with(Property::Density, water_fit(&[-0.003416, -0.09298, 1001.0]))
        .with(
            Property::SpecificHeat,
            water_fit(&[-4.178e-11, 1.384e-08, -1.737e-06, 0.0001115, -0.003429, 4.218]),
        )
        .with(
            Property::Conductivity,
            water_fit(&[-0.00001118, 0.002257, 0.5587]),
        )
}

pub fn air() -> Material {
    Material::new("air", Phase::Gas)
        .with(Property::Density, air_fit(&[1.75e-05, -0.00483, 1.293]))
        .with(Property::SpecificHeat, air_fit(&[1.005]))
        .with(Property::Conductivity, air_fit(&[7e-05, 0.0243]))
        .with(Property::Prandtl, air_fit(&[-4.705e-19, -0.0001, 0.715]))
        .with(Property::Viscosity, air_fit(&[7.5e-11, 8.88e-08, 1.33e-05]))
}

/// Water with a temperature-independent specific heat.
pub fn const_water() -> Material {
    Material::new("const_water", Phase::Liquid)
        .with(Property::Density, PropertyFn::constant(1000.0))
        .with(Property::SpecificHeat, PropertyFn::constant(4.218))
}

/// Air with a temperature-independent specific heat.
pub fn const_air() -> Material {
    Material::new("const_air", Phase::Gas)
        .with(Property::Density, PropertyFn::constant(1.2))
        .with(Property::SpecificHeat, PropertyFn::constant(1.005))
}

pub fn silicon_tubing() -> Material {
    solid("silicon_tubing", 0.145)
}

pub fn silicon_insulation() -> Material {
    solid("silicon_insulation", 0.037)
}

pub fn glass() -> Material {
    solid("glass", 1.05)
}

/// Argon fill gas of an insulated glazing unit; only used as a static layer.
pub fn argon() -> Material {
    Material::new("argon", Phase::Gas).with(Property::Conductivity, PropertyFn::constant(0.016))
}

fn solid(name: &str, k: f64) -> Material {
    Material::new(name, Phase::Solid).with(Property::Conductivity, PropertyFn::constant(k))
}

/// Every built-in material.
pub fn all() -> Vec<Material> {
    vec![
        water(),
        air(),
        const_water(),
        const_air(),
        silicon_tubing(),
        silicon_insulation(),
        glass(),
        argon(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_core::StateMap;

    fn t(v: f64) -> StateMap {
        let mut s = StateMap::new();
        s.insert(TEMPERATURE.into(), v);
        s
    }

    #[test]
    fn water_density_at_20c() {
        let rho = water().density(&t(20.0)).unwrap();
        assert!((rho - 997.774).abs() < 1e-9);
    }

    #[test]
    fn water_specific_heat_is_near_4_18() {
        let cp = water().specific_heat(&t(25.0)).unwrap();
        assert!((cp - 4.18).abs() < 0.01, "cp = {cp}");
    }

    #[test]
    fn water_fit_rejects_steam() {
        assert!(water().density(&t(120.0)).is_err());
    }

    #[test]
    fn solids_are_state_independent() {
        assert_eq!(glass().conductivity(&StateMap::new()).unwrap(), 1.05);
        assert_eq!(
            silicon_insulation()
                .eval_reference(Property::Conductivity)
                .unwrap(),
            0.037
        );
    }

    #[test]
    fn air_gas_properties_present() {
        let a = air();
        let s = t(20.0);
        assert!(a.viscosity(&s).unwrap() > 1e-5);
        let pr = a.prandtl(&s).unwrap();
        assert!((pr - 0.713).abs() < 1e-3);
    }

    #[test]
    fn catalog_names_unique() {
        let mut names: Vec<_> = all().into_iter().map(|m| m.name).collect();
        let n = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), n);
    }
}
