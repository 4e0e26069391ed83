use proptest::prelude::*;
use sdk::errors::{EngineError, EngineErrorExt};
use sdk::types::{PlanStep, ToolKind, WeatherCondition, WeatherReport};

proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::Database(error_str.clone()),
            EngineError::LLMProvider(error_str.clone()),
            EngineError::Network(error_str.clone()),
            EngineError::NotFound(error_str.clone()),
            EngineError::Timeout { operation: error_str.clone(), millis: 10 },
            EngineError::Parse(error_str.clone()),
            EngineError::Cache(error_str.clone()),
            EngineError::InvalidInput(error_str.clone()),
        ];

        for err in errs {
            prop_assert!(!err.user_hint().is_empty());
            prop_assert!(err.is_recoverable() != matches!(err, EngineError::Config(_)));
        }
    }

    #[test]
    fn test_weather_labels_never_speed_up(label in "\\PC{0,24}") {
        let condition = WeatherCondition::from_label(&label);
        let report = WeatherReport::for_condition(condition);
        prop_assert!(report.delay_factor >= 1.0);
        prop_assert!(report.delay_factor <= 2.0);
        prop_assert_eq!(condition.is_adverse(), report.delay_factor > 1.0);
    }

    #[test]
    fn test_blank_params_read_as_missing(value in "[ \\t]{0,5}") {
        let step = PlanStep::new(ToolKind::Gps).with_param("bus_id", Some(value));
        prop_assert_eq!(step.param("bus_id"), None);
    }

    #[test]
    fn test_params_are_trimmed(id in "[A-Z][0-9]{1,4}") {
        let step = PlanStep::new(ToolKind::Eta).with_param("stop_id", Some(format!("  {} ", id)));
        prop_assert_eq!(step.param("stop_id"), Some(id.as_str()));
    }
}
