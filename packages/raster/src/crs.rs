//! Coordinate reference system identities for raster layers.
//!
//! A layer's CRS is read from its `GeoTIFF` keys as an EPSG code. The
//! string form (`EPSG:32638`) is the identity the reprojection cache keys
//! on. Raw `proj4` definitions are accepted as an escape hatch for
//! rasters carrying a CRS outside the built-in table.

use std::fmt;
use std::str::FromStr;

use crate::RasterError;

/// EPSG code of WGS84 geographic coordinates (longitude/latitude).
pub const EPSG_WGS84: u32 = 4326;
/// EPSG code of spherical Web Mercator.
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// A coordinate reference system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Crs {
    /// A CRS identified by EPSG code.
    Epsg(u32),
    /// A raw `proj4` definition string.
    Proj(String),
}

impl Crs {
    /// WGS84 longitude/latitude.
    pub const WGS84: Self = Self::Epsg(EPSG_WGS84);

    /// The string identity of this CRS, used as the cache key.
    #[must_use]
    pub fn identifier(&self) -> String {
        match self {
            Self::Epsg(code) => format!("EPSG:{code}"),
            Self::Proj(definition) => definition.trim().to_string(),
        }
    }

    /// Returns `true` for geographic (unprojected, degree-based) systems.
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        match self {
            Self::Epsg(code) => is_geographic_epsg(*code),
            Self::Proj(definition) => {
                definition.contains("+proj=longlat") || definition.contains("+proj=latlong")
            }
        }
    }

    /// Returns the `proj4` definition for this CRS, if one is known.
    #[must_use]
    pub fn proj_string(&self) -> Option<String> {
        match self {
            Self::Epsg(code) => epsg_proj_string(*code),
            Self::Proj(definition) => Some(definition.trim().to_string()),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl FromStr for Crs {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('+') {
            return Ok(Self::Proj(s.to_string()));
        }

        let code = s
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("EPSG:"))
            .and_then(|_| s[5..].trim().parse::<u32>().ok())
            .ok_or_else(|| RasterError::UnsupportedCrs(s.to_string()))?;

        Ok(Self::Epsg(code))
    }
}

/// EPSG codes in the 4000 block are geographic 2D systems.
#[must_use]
pub const fn is_geographic_epsg(code: u32) -> bool {
    code >= 4000 && code < 5000
}

/// Returns the `proj4` definition for the supported EPSG codes: WGS84,
/// Web Mercator, and the WGS84 UTM zones.
fn epsg_proj_string(code: u32) -> Option<String> {
    match code {
        EPSG_WGS84 => Some("+proj=longlat +datum=WGS84 +no_defs".to_string()),
        EPSG_WEB_MERCATOR => Some(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs"
                .to_string(),
        ),
        32601..=32660 => Some(format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
            code - 32600
        )),
        32701..=32760 => Some(format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            code - 32700
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_epsg_identifiers() {
        assert_eq!("EPSG:32638".parse::<Crs>().unwrap(), Crs::Epsg(32638));
        assert_eq!("epsg:4326".parse::<Crs>().unwrap(), Crs::WGS84);
    }

    #[test]
    fn parses_proj_definitions() {
        let crs: Crs = "+proj=utm +zone=38 +datum=WGS84".parse().unwrap();
        assert!(matches!(crs, Crs::Proj(_)));
        assert!(!crs.is_geographic());
    }

    #[test]
    fn rejects_garbage() {
        assert!("WGS 84".parse::<Crs>().is_err());
        assert!("EPSG:abc".parse::<Crs>().is_err());
    }

    #[test]
    fn identifier_is_stable() {
        assert_eq!(Crs::Epsg(32638).identifier(), "EPSG:32638");
        assert_eq!(Crs::Epsg(32638).to_string(), "EPSG:32638");
    }

    #[test]
    fn classifies_geographic_systems() {
        assert!(Crs::WGS84.is_geographic());
        assert!(!Crs::Epsg(32638).is_geographic());
        assert!(!Crs::Epsg(EPSG_WEB_MERCATOR).is_geographic());
        assert!(Crs::Proj("+proj=longlat +datum=WGS84".to_string()).is_geographic());
    }

    #[test]
    fn builds_utm_definitions() {
        assert_eq!(
            Crs::Epsg(32638).proj_string().unwrap(),
            "+proj=utm +zone=38 +datum=WGS84 +units=m +no_defs"
        );
        assert!(Crs::Epsg(32738).proj_string().unwrap().contains("+south"));
        assert!(Crs::Epsg(20538).proj_string().is_none());
    }
}
