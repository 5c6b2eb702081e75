//! Offline whois backend: geolocation from a MaxMind City database

use crate::table::models::WhoisRecord;
use crate::Result;
use maxminddb::{geoip2, Reader};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// Geographic location information for an IP address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoLocation {
    /// ISO 3166-1 alpha-2 country code (e.g., "US", "CN")
    pub country_code: Option<String>,
    /// Country name in English
    pub country_name: Option<String>,
    /// City name in English
    pub city_name: Option<String>,
    /// Timezone (e.g., "America/New_York")
    pub timezone: Option<String>,
}

impl GeoLocation {
    /// Check if the location has any meaningful data
    pub fn is_empty(&self) -> bool {
        self.country_code.is_none() && self.country_name.is_none() && self.city_name.is_none()
    }

    /// Whois row for `ip`; an empty location is a failed lookup
    pub fn into_whois_record(self, ip: &str) -> WhoisRecord {
        if self.is_empty() {
            return WhoisRecord::failed(ip, "Address not found in database");
        }

        let mut record = WhoisRecord::success(ip);
        record.flag = self
            .country_code
            .as_deref()
            .map(flag_url)
            .unwrap_or_default();
        record.country_code = self.country_code.unwrap_or_default();
        record.country = self.country_name.unwrap_or_default();
        record.city = self.city_name.unwrap_or_default();
        record.timezone = self.timezone.unwrap_or_default();
        record
    }
}

/// Flag image URL in the same scheme ipwho.is uses
fn flag_url(country_code: &str) -> String {
    format!("https://cdn.ipwhois.io/flags/{}.svg", country_code.to_lowercase())
}

/// GeoLocator for looking up IP addresses in MMDB databases
pub struct GeoLocator {
    reader: Arc<Reader<Vec<u8>>>,
}

impl GeoLocator {
    /// Create a new GeoLocator from an MMDB file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    /// Whois row for an IP string; lookup errors become failed rows
    pub fn whois(&self, ip: &str) -> WhoisRecord {
        match self.lookup(ip) {
            Ok(location) => location.into_whois_record(ip),
            Err(e) => WhoisRecord::failed(ip, e.to_string()),
        }
    }

    /// Look up the geolocation for an IP address string
    pub fn lookup(&self, ip_str: &str) -> Result<GeoLocation> {
        let ip: IpAddr = ip_str.parse()?;
        self.lookup_ip(ip)
    }

    /// Look up the geolocation for an IpAddr
    pub fn lookup_ip(&self, ip: IpAddr) -> Result<GeoLocation> {
        let lookup_result = self.reader.lookup(ip)?;

        let city: Option<geoip2::City> = lookup_result.decode()?;

        let Some(city) = city else {
            return Ok(GeoLocation::default());
        };

        Ok(GeoLocation {
            country_code: city.country.iso_code.map(String::from),
            country_name: city.country.names.english.map(String::from),
            city_name: city.city.names.english.map(String::from),
            timezone: city.location.time_zone.map(String::from),
        })
    }
}

impl Clone for GeoLocator {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_location_default_is_failed_row() {
        let loc = GeoLocation::default();
        assert!(loc.is_empty());

        let record = loc.into_whois_record("10.0.0.1");
        assert!(!record.is_success());
        assert_eq!(record.ip, "10.0.0.1");
        assert!(record.error.is_some());
    }

    #[test]
    fn test_geo_location_into_whois_record() {
        let loc = GeoLocation {
            country_code: Some("US".to_string()),
            country_name: Some("United States".to_string()),
            city_name: Some("New York".to_string()),
            timezone: Some("America/New_York".to_string()),
        };

        let record = loc.into_whois_record("8.8.8.8");
        assert!(record.is_success());
        assert_eq!(record.country, "United States");
        assert_eq!(record.country_code, "US");
        assert_eq!(record.city, "New York");
        assert_eq!(record.timezone, "America/New_York");
        assert_eq!(record.flag, "https://cdn.ipwhois.io/flags/us.svg");
        assert_eq!(record.isp, "");
    }

    #[test]
    fn test_missing_database_is_error() {
        assert!(GeoLocator::from_path("/nonexistent/GeoLite2-City.mmdb").is_err());
    }
}
