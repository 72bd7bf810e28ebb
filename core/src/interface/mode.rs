use crate::prelude::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction estimators the engine can dispatch to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DoaMethod {
    SrpPhat,
    #[serde(rename = "tdoa-ls", alias = "least-squares")]
    LeastSquares,
}

impl DoaMethod {
    pub const ALL: [DoaMethod; 2] = [DoaMethod::SrpPhat, DoaMethod::LeastSquares];

    pub fn as_str(&self) -> &'static str {
        match self {
            DoaMethod::SrpPhat => "srp-phat",
            DoaMethod::LeastSquares => "tdoa-ls",
        }
    }
}

/// Beamformers the engine can dispatch to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BeamformerMethod {
    DelayAndSum,
    Mvdr,
    BroadbandMvdr,
    Superdirective,
}

impl BeamformerMethod {
    pub const ALL: [BeamformerMethod; 4] = [
        BeamformerMethod::DelayAndSum,
        BeamformerMethod::Mvdr,
        BeamformerMethod::BroadbandMvdr,
        BeamformerMethod::Superdirective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BeamformerMethod::DelayAndSum => "delay-and-sum",
            BeamformerMethod::Mvdr => "mvdr",
            BeamformerMethod::BroadbandMvdr => "broadband-mvdr",
            BeamformerMethod::Superdirective => "superdirective",
        }
    }
}

impl fmt::Display for DoaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BeamformerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoaMethod {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "srp-phat" | "srp" => Ok(DoaMethod::SrpPhat),
            "tdoa-ls" | "least-squares" | "ls" => Ok(DoaMethod::LeastSquares),
            other => Err(EngineError::InvalidConfig(format!(
                "unknown DOA method '{}'",
                other
            ))),
        }
    }
}

impl FromStr for BeamformerMethod {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "delay-and-sum" | "das" | "ds" => Ok(BeamformerMethod::DelayAndSum),
            "mvdr" => Ok(BeamformerMethod::Mvdr),
            "broadband-mvdr" | "bb-mvdr" => Ok(BeamformerMethod::BroadbandMvdr),
            "superdirective" | "sd" => Ok(BeamformerMethod::Superdirective),
            other => Err(EngineError::InvalidConfig(format!(
                "unknown beamformer '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for method in BeamformerMethod::ALL {
            assert_eq!(method.as_str().parse::<BeamformerMethod>().unwrap(), method);
        }
        for method in DoaMethod::ALL {
            assert_eq!(method.as_str().parse::<DoaMethod>().unwrap(), method);
        }
    }

    #[test]
    fn unknown_names_are_config_errors() {
        assert!(matches!(
            "beamscan".parse::<BeamformerMethod>(),
            Err(EngineError::InvalidConfig(_))
        ));
        assert!("music".parse::<DoaMethod>().is_err());
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&BeamformerMethod::BroadbandMvdr).unwrap();
        assert_eq!(json, "\"broadband-mvdr\"");
        let method: DoaMethod = serde_json::from_str("\"srp-phat\"").unwrap();
        assert_eq!(method, DoaMethod::SrpPhat);
        let json = serde_json::to_string(&DoaMethod::LeastSquares).unwrap();
        assert_eq!(json, format!("\"{}\"", DoaMethod::LeastSquares));
    }
}
