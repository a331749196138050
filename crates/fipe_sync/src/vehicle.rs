//! Vehicle record types shared by every pipeline stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::names::fold;

/// Upstream vehicle category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Car,
    Motorcycle,
    Truck,
}

impl VehicleType {
    /// All categories in processing order.
    pub const ALL: [VehicleType; 3] = [VehicleType::Car, VehicleType::Motorcycle, VehicleType::Truck];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::Car => "car",
            VehicleType::Motorcycle => "motorcycle",
            VehicleType::Truck => "truck",
        }
    }

    /// Path segment used by the REST endpoint family.
    #[must_use]
    pub fn path_segment(self) -> &'static str {
        match self {
            VehicleType::Car => "carros",
            VehicleType::Motorcycle => "motos",
            VehicleType::Truck => "caminhoes",
        }
    }

    /// Numeric category used by the form-POST endpoint family.
    #[must_use]
    pub fn form_code(self) -> u8 {
        match self {
            VehicleType::Car => 1,
            VehicleType::Motorcycle => 2,
            VehicleType::Truck => 3,
        }
    }

    /// `tipoVeiculo` value expected by the form-POST detail endpoint.
    #[must_use]
    pub fn form_kind(self) -> &'static str {
        match self {
            VehicleType::Car => "carro",
            VehicleType::Motorcycle => "moto",
            VehicleType::Truck => "caminhao",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vehicle type: {0}")]
pub struct UnknownVehicleType(pub String);

impl FromStr for VehicleType {
    type Err = UnknownVehicleType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s.trim()).as_str() {
            "car" | "cars" | "carro" | "carros" => Ok(VehicleType::Car),
            "motorcycle" | "motorcycles" | "moto" | "motos" => Ok(VehicleType::Motorcycle),
            "truck" | "trucks" | "caminhao" | "caminhoes" => Ok(VehicleType::Truck),
            _ => Err(UnknownVehicleType(s.to_string())),
        }
    }
}

/// Fuel kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fuel {
    Gasoline,
    Ethanol,
    Diesel,
    Flex,
    Electric,
    Hybrid,
    Unknown,
}

impl Fuel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Fuel::Gasoline => "gasoline",
            Fuel::Ethanol => "ethanol",
            Fuel::Diesel => "diesel",
            Fuel::Flex => "flex",
            Fuel::Electric => "electric",
            Fuel::Hybrid => "hybrid",
            Fuel::Unknown => "unknown",
        }
    }

    /// Parse an upstream fuel label such as `"Gasolina"` or `"Álcool"`.
    #[must_use]
    pub fn from_label(label: &str) -> Fuel {
        let folded = fold(label);
        let folded = folded.trim();
        if folded.is_empty() {
            return Fuel::Unknown;
        }
        if folded.contains("flex") {
            Fuel::Flex
        } else if folded.contains("hibrido") || folded.contains("hybrid") {
            Fuel::Hybrid
        } else if folded.contains("eletric") || folded.contains("electric") {
            Fuel::Electric
        } else if folded.contains("diesel") {
            Fuel::Diesel
        } else if folded.contains("alcool") || folded.contains("etanol") {
            Fuel::Ethanol
        } else if folded.contains("gasolina") || folded.contains("gasoline") {
            Fuel::Gasoline
        } else {
            match folded {
                "g" => Fuel::Gasoline,
                "a" | "e" => Fuel::Ethanol,
                "d" => Fuel::Diesel,
                _ => Fuel::Unknown,
            }
        }
    }

    /// Parse the numeric fuel code carried in upstream year codes (`2021-1`).
    #[must_use]
    pub fn from_code(code: u32) -> Fuel {
        match code {
            1 => Fuel::Gasoline,
            2 => Fuel::Ethanol,
            3 => Fuel::Diesel,
            4 => Fuel::Electric,
            5 => Fuel::Flex,
            6 => Fuel::Hybrid,
            _ => Fuel::Unknown,
        }
    }
}

impl fmt::Display for Fuel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gearbox family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transmission {
    Cvt,
    DualClutch,
    Automatic,
    Manual,
    AutomatedManual,
    Unidentified,
}

impl Transmission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Transmission::Cvt => "cvt",
            Transmission::DualClutch => "dual_clutch",
            Transmission::Automatic => "automatic",
            Transmission::Manual => "manual",
            Transmission::AutomatedManual => "automated_manual",
            Transmission::Unidentified => "unidentified",
        }
    }
}

/// Body style, per vehicle category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    // Cars
    Hatch,
    Sedan,
    Suv,
    Pickup,
    Wagon,
    Coupe,
    Convertible,
    Minivan,
    Van,
    // Motorcycles
    Street,
    Sport,
    Trail,
    Scooter,
    Custom,
    Touring,
    Naked,
    // Heavy vehicles
    Truck,
    Tractor,
    Chassis,
    Bus,
}

impl BodyType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BodyType::Hatch => "hatch",
            BodyType::Sedan => "sedan",
            BodyType::Suv => "suv",
            BodyType::Pickup => "pickup",
            BodyType::Wagon => "wagon",
            BodyType::Coupe => "coupe",
            BodyType::Convertible => "convertible",
            BodyType::Minivan => "minivan",
            BodyType::Van => "van",
            BodyType::Street => "street",
            BodyType::Sport => "sport",
            BodyType::Trail => "trail",
            BodyType::Scooter => "scooter",
            BodyType::Custom => "custom",
            BodyType::Touring => "touring",
            BodyType::Naked => "naked",
            BodyType::Truck => "truck",
            BodyType::Tractor => "tractor",
            BodyType::Chassis => "chassis",
            BodyType::Bus => "bus",
        }
    }

    /// Fallback when no keyword matches.
    #[must_use]
    pub fn default_for(vehicle_type: VehicleType) -> BodyType {
        match vehicle_type {
            VehicleType::Car => BodyType::Hatch,
            VehicleType::Motorcycle => BodyType::Street,
            VehicleType::Truck => BodyType::Truck,
        }
    }
}

/// A vehicle as returned by the upstream, before any interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVehicleRecord {
    pub brand: String,
    /// Free-text model name, e.g. `"Civic Sedan EXL 2.0 Flex 16V Aut."`.
    pub model: String,
    pub year: i32,
    pub fuel_original: String,
    pub price: Option<f64>,
    pub fipe_code: String,
    pub vehicle_type: VehicleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_month: Option<String>,
}

/// Structured attributes derived from a [`RawVehicleRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedVehicleRecord {
    pub brand: String,
    pub base_model: String,
    pub full_model_name: String,
    pub year: i32,
    pub trim: Option<String>,
    pub engine_code: Option<String>,
    pub engine_name: Option<String>,
    pub displacement_cc: Option<u32>,
    pub valves: Option<u32>,
    pub fuel: Fuel,
    pub transmission: Transmission,
    pub body_type: BodyType,
    pub vehicle_type: VehicleType,
    pub power: Option<u32>,
    pub turbo: bool,
    pub fipe_code: String,
    #[serde(default)]
    pub price: Option<f64>,
}
