use serde::de::DeserializeOwned;

/// A JSON document that failed to deserialize, with the path of the
/// offending value (`.` when the failure is at the document root).
#[derive(Debug)]
pub(crate) struct JsonFailure {
    pub(crate) location: String,
    pub(crate) source: serde_json::Error,
}

pub(crate) fn from_json_str<T: DeserializeOwned>(raw: &str) -> Result<T, JsonFailure> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let value = serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let location = if path.is_empty() { ".".to_string() } else { path };
        JsonFailure {
            location,
            source: error.into_inner(),
        }
    })?;
    deserializer.end().map_err(|source| JsonFailure {
        location: ".".to_string(),
        source,
    })?;
    Ok(value)
}
