pub const DEFAULT_GEOCODING_BASE_URL: &str = "http://api.openweathermap.org/geo/1.0";
pub const DEFAULT_AIR_POLLUTION_BASE_URL: &str =
    "http://api.openweathermap.org/data/2.5/air_pollution";
pub const DEFAULT_IP_GEOLOCATION_BASE_URL: &str = "https://ipinfo.io";
pub const DEFAULT_CLASSIFIER_BASE_URL: &str =
    "https://fastapi-voting-based-model-api-for-plant.onrender.com";

pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_HISTORY_RETENTION_RECORDS: usize = 48;

// Display name used when the IP geolocation provider omits the city field.
pub const UNKNOWN_LOCATION_NAME: &str = "Your Location";

pub const RECORD_MAGIC: [u8; 4] = *b"PQAQ";
pub const RECORD_VERSION: u16 = 1;
