//! `local.*` tools: facts about the machine the engine runs on.
//!
//! `local.local_time` reports the current wall-clock time in a named
//! timezone; `local.local_address` reports the deployment site's street
//! address, a fixed string until a real location source exists.

use chrono::Utc;
use chrono_tz::Tz;
use serde_json::{Map, Value, json};
use taskloom_core::error::EngineError;
use taskloom_types::param::ParamType;
use taskloom_types::template::{ParamSpec, ToolMetadata};

use super::required_str;

pub(super) const LOCAL_TIME_ID: &str = "local.local_time";

pub(super) fn local_time_metadata() -> ToolMetadata {
    ToolMetadata {
        id: LOCAL_TIME_ID.to_string(),
        name: "local_time".to_string(),
        description: "current date and time in the given IANA timezone".to_string(),
        inputs: vec![ParamSpec {
            name: "timezone".to_string(),
            description: "IANA timezone name, e.g. Asia/Shanghai".to_string(),
            ty: ParamType::String,
            default: Some(json!("Asia/Shanghai")),
        }],
        outputs: vec![ParamSpec {
            name: "local_time".to_string(),
            description: "formatted local time, YYYY-MM-DD HH:MM:SS".to_string(),
            ty: ParamType::String,
            default: None,
        }],
    }
}

pub(super) fn local_time(inputs: &Map<String, Value>) -> Result<Map<String, Value>, EngineError> {
    let timezone = required_str(inputs, "timezone")?;
    let tz: Tz = timezone
        .parse()
        .map_err(|_| EngineError::Parameter(format!("unknown timezone '{timezone}'")))?;
    let now = Utc::now().with_timezone(&tz);

    let mut outputs = Map::new();
    outputs.insert(
        "local_time".to_string(),
        json!(now.format("%Y-%m-%d %H:%M:%S").to_string()),
    );
    Ok(outputs)
}

pub(super) const LOCAL_ADDRESS_ID: &str = "local.local_address";

const LOCAL_ADDRESS: &str = "Longyueyuan Erqu, Huilongguan, Changping District, Beijing";

pub(super) fn local_address_metadata() -> ToolMetadata {
    ToolMetadata {
        id: LOCAL_ADDRESS_ID.to_string(),
        name: "get_local_address".to_string(),
        description: "street address of the deployment site".to_string(),
        inputs: vec![],
        outputs: vec![ParamSpec {
            name: "local_address".to_string(),
            description: "formatted address string".to_string(),
            ty: ParamType::String,
            default: None,
        }],
    }
}

pub(super) fn local_address(
    _inputs: &Map<String, Value>,
) -> Result<Map<String, Value>, EngineError> {
    let mut outputs = Map::new();
    outputs.insert("local_address".to_string(), json!(LOCAL_ADDRESS));
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(timezone: &str) -> Result<Map<String, Value>, EngineError> {
        let mut inputs = Map::new();
        inputs.insert("timezone".to_string(), json!(timezone));
        local_time(&inputs)
    }

    #[test]
    fn formats_local_time_for_a_valid_timezone() {
        let outputs = run("Asia/Shanghai").unwrap();
        let text = outputs["local_time"].as_str().unwrap();
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(text.len(), 19);
        assert_eq!(&text[4..5], "-");
        assert_eq!(&text[10..11], " ");
    }

    #[test]
    fn unknown_timezone_is_a_parameter_error() {
        let err = run("Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, EngineError::Parameter(_)));
    }

    #[test]
    fn local_address_takes_no_inputs() {
        assert!(local_address_metadata().inputs.is_empty());
        let outputs = local_address(&Map::new()).unwrap();
        assert_eq!(outputs["local_address"], json!(LOCAL_ADDRESS));
    }
}
