//! Integration tests for encoding models into flows and reconstructing them.
//!
//! These tests run the full pipeline: live model -> `Flow` -> storage -> model.
mod common;
use common::*;
use modelflow::error::SymbolKind;
use modelflow::learnkit::compose::ColumnTransformer;
use modelflow::learnkit::ensemble::{BaggingRegressor, VotingRegressor};
use modelflow::learnkit::linear_model::Ridge;
use modelflow::learnkit::pipeline::Pipeline;
use modelflow::learnkit::preprocessing::StandardScaler;
use modelflow::prelude::*;

const SCALE_REFERENCE: &str = r#"{"oml-python:serialized_object": "component_reference", "value": {"key": "scale", "step_name": "scale"}}"#;
const FIT_REFERENCE: &str = r#"{"oml-python:serialized_object": "component_reference", "value": {"key": "fit", "step_name": "fit"}}"#;

#[cfg(test)]
mod flow_tests {
    use super::*;

    #[test]
    fn test_pipeline_flow_structure() {
        let flow = codec()
            .model_to_flow(&pipeline_model())
            .expect("Pipeline should encode");

        assert_eq!(
            flow.name,
            "learnkit.pipeline.Pipeline(scale=learnkit.preprocessing.StandardScaler,fit=learnkit.linear_model.Ridge)"
        );
        assert_eq!(flow.class_name, "learnkit.pipeline.Pipeline");
        assert_eq!(flow.flow_id, None);

        let names: Vec<&str> = flow.parameters.keys().map(String::as_str).collect();
        assert_eq!(names, ["memory", "steps"]);
        assert_eq!(flow.parameters["memory"].as_deref(), Some("null"));
        assert_eq!(
            flow.parameters["steps"].as_deref(),
            Some(format!("[{}, {}]", SCALE_REFERENCE, FIT_REFERENCE).as_str())
        );
        assert!(
            flow.parameters_meta_info
                .values()
                .all(|meta| meta.description.is_none() && meta.data_type.is_none())
        );

        let keys: Vec<&str> = flow.components.keys().map(String::as_str).collect();
        assert_eq!(keys, ["scale", "fit"]);
        let ridge = &flow.components["fit"];
        assert_eq!(ridge.name, "learnkit.linear_model.Ridge");
        assert_eq!(ridge.parameters["alpha"].as_deref(), Some("2.0"));
        assert_eq!(ridge.parameters["fit_intercept"].as_deref(), Some("true"));
        assert_eq!(
            flow.components["scale"].parameters["dtype"].as_deref(),
            Some(r#"{"oml-python:serialized_object": "type", "value": "np.float64"}"#)
        );
    }

    #[test]
    fn test_flow_metadata() {
        let flow = codec()
            .model_to_flow(&pipeline_model())
            .expect("Pipeline should encode");
        let version = env!("CARGO_PKG_VERSION");

        assert_eq!(flow.external_version, builtin_external_version());
        assert_eq!(
            flow.dependencies,
            format!("learnkit=={}\nmodelflow>={}", version, version)
        );
        assert_eq!(flow.description, "Automatically created learnkit flow.");
        assert_eq!(flow.language, "English");
        assert!(flow.tags.contains(&"modelflow".to_string()));
        assert!(flow.tags.contains(&format!("learnkit_{}", version)));
        for component in flow.components.values() {
            assert_eq!(component.external_version, builtin_external_version());
        }
    }

    #[test]
    fn test_configured_metadata() {
        let config = CodecConfig::from_toml_str(
            r#"
            description = "Ridge baseline"
            tags = ["baseline"]
            "#,
        )
        .expect("Config should parse");
        let codec = Codec::builder().with_config(config).build();
        let flow = codec
            .model_to_flow(&Ridge::default())
            .expect("Ridge should encode");

        assert_eq!(flow.description, "Ridge baseline");
        assert_eq!(flow.tags.last().map(String::as_str), Some("baseline"));
    }

    #[test]
    fn test_pipeline_round_trip() {
        let codec = codec();
        let flow = codec
            .model_to_flow(&pipeline_model())
            .expect("Pipeline should encode");

        let rebuilt = codec.flow_to_model(&flow).expect("Flow should decode");
        assert_eq!(rebuilt.class_name(), "learnkit.pipeline.Pipeline");
        assert_eq!(
            rebuilt.get_params()["steps"],
            pipeline_model().get_params()["steps"],
            "Steps should come back as the same (name, model) tuples in order"
        );
        assert_eq!(
            rebuilt.get_params_deep()["fit__alpha"],
            Value::Float(2.0)
        );

        let again = codec
            .model_to_flow(rebuilt.as_ref())
            .expect("Rebuilt pipeline should encode");
        assert_eq!(again, flow, "Descriptor should be stable across a round trip");
    }

    #[test]
    fn test_rebuilt_model_trains_like_the_original() {
        let codec = codec();
        let (x, y) = linear_data();

        let mut original: Box<dyn Estimator> = Box::new(pipeline_model());
        let flow = codec.model_to_flow(original.as_ref()).expect("Pipeline should encode");
        let mut rebuilt = codec.flow_to_model(&flow).expect("Flow should decode");

        original.fit(&x, &y).expect("Original should fit");
        rebuilt.fit(&x, &y).expect("Rebuilt should fit");
        let expected = original.predict(&x).expect("Original should predict");
        let actual = rebuilt.predict(&x).expect("Rebuilt should predict");
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_search_model_round_trip() {
        let codec = codec();
        let model = search_model();
        let flow = codec.model_to_flow(&model).expect("Search should encode");

        assert_eq!(flow.components.len(), 1);
        assert!(flow.parameters["estimator"]
            .as_deref()
            .is_some_and(|wire| wire.contains("component_reference")));
        assert!(flow.parameters["cv"]
            .as_deref()
            .is_some_and(|wire| wire.contains("learnkit.model_selection.KFold")));
        assert_eq!(
            flow.parameters["param_grid"].as_deref(),
            Some(r#"{"fit__alpha": [0.01, 1.0, 100.0]}"#)
        );
        assert_eq!(flow.components["estimator"].components.len(), 2);

        let rebuilt = codec.flow_to_model(&flow).expect("Search flow should decode");
        let again = codec.model_to_flow(rebuilt.as_ref()).expect("Rebuilt search should encode");
        assert_eq!(again, flow);
    }

    #[test]
    fn test_single_component_parameter() {
        let codec = codec();
        let model = BaggingRegressor::new(Ridge::new(0.5)).n_estimators(4);
        let flow = codec.model_to_flow(&model).expect("Bagging should encode");

        assert_eq!(
            flow.name,
            "learnkit.ensemble.BaggingRegressor(base_estimator=learnkit.linear_model.Ridge)"
        );
        assert_eq!(
            flow.parameters["base_estimator"].as_deref(),
            Some(r#"{"oml-python:serialized_object": "component_reference", "value": {"key": "base_estimator", "step_name": null}}"#)
        );

        let rebuilt = codec.flow_to_model(&flow).expect("Bagging flow should decode");
        let params = rebuilt.get_params_deep();
        assert_eq!(params["n_estimators"], Value::Int(4));
        assert_eq!(params["base_estimator__alpha"], Value::Float(0.5));
    }

    #[test]
    fn test_duplicate_components_are_rejected() {
        let model = VotingRegressor::new(vec![
            Value::step("small", Ridge::new(0.1)),
            Value::step("large", Ridge::new(10.0)),
        ]);
        match codec().model_to_flow(&model) {
            Err(CodecError::DuplicateComponent { component, model }) => {
                assert_eq!(component, "learnkit.linear_model.Ridge");
                assert_eq!(model, "learnkit.ensemble.VotingRegressor");
            }
            other => panic!("Expected DuplicateComponent, got {:?}", other.map(|f| f.name)),
        }
    }

    #[test]
    fn test_nested_duplicate_components_are_rejected() {
        let inner = Pipeline::new(vec![
            Value::step("rescale", StandardScaler::new()),
            Value::step("fit", Ridge::default()),
        ]);
        let model = Pipeline::new(vec![
            Value::step("scale", StandardScaler::new()),
            Value::step("inner", inner),
        ]);
        match codec().model_to_flow(&model) {
            Err(CodecError::DuplicateComponent { component, model }) => {
                assert_eq!(component, "learnkit.preprocessing.StandardScaler");
                assert_eq!(model, "learnkit.pipeline.Pipeline");
            }
            other => panic!("Expected DuplicateComponent, got {:?}", other.map(|f| f.name)),
        }
    }

    #[test]
    fn test_disabled_step_is_kept_as_null() {
        let codec = codec();
        let model = VotingRegressor::new(vec![
            Value::step("fit", Ridge::default()),
            Value::Tuple(vec![Value::Str("off".into()), Value::Null]),
        ]);
        let flow = codec.model_to_flow(&model).expect("Voting should encode");

        assert_eq!(flow.components.len(), 1);
        assert!(flow.parameters["estimators"]
            .as_deref()
            .is_some_and(|wire| wire.ends_with(r#"["off", null]]"#)));

        let rebuilt = codec.flow_to_model(&flow).expect("Voting flow should decode");
        let estimators = &rebuilt.get_params()["estimators"];
        assert_eq!(estimators.as_sequence().map(<[Value]>::len), Some(2));

        let again = codec
            .model_to_flow(rebuilt.as_ref())
            .expect("Rebuilt voting model should encode");
        assert_eq!(again, flow);
    }

    #[test]
    fn test_disabled_pipeline_step_round_trip() {
        let codec = codec();
        let model = Pipeline::new(vec![
            Value::Tuple(vec![Value::Str("off".into()), Value::Null]),
            Value::step("fit", Ridge::default()),
        ]);
        let flow = codec.model_to_flow(&model).expect("Pipeline should encode");
        assert_eq!(
            flow.parameters["steps"].as_deref(),
            Some(format!(r#"[["off", null], {}]"#, FIT_REFERENCE).as_str())
        );

        let rebuilt = codec.flow_to_model(&flow).expect("Pipeline flow should decode");
        assert_eq!(
            rebuilt.get_params()["steps"],
            model.get_params()["steps"],
            "Disabled steps should come back as tuples like their siblings"
        );

        let again = codec
            .model_to_flow(rebuilt.as_ref())
            .expect("Rebuilt pipeline should encode");
        assert_eq!(again, flow);
    }

    #[test]
    fn test_column_transformer_round_trip() {
        let codec = codec();
        let model = ColumnTransformer::new().transformer("scale", StandardScaler::new(), &[0, 1]);
        let flow = codec.model_to_flow(&model).expect("Column transformer should encode");

        assert_eq!(
            flow.parameters["transformers"].as_deref(),
            Some(r#"[{"oml-python:serialized_object": "component_reference", "value": {"key": "scale", "step_name": "scale", "argument_1": [0, 1]}}]"#)
        );
        assert_eq!(flow.parameters["remainder"].as_deref(), Some(r#""drop""#));

        let rebuilt = codec.flow_to_model(&flow).expect("Column transformer flow should decode");
        let transformers = &rebuilt.get_params()["transformers"];
        let Some([Value::Str(name), Value::Model(scaler), columns]) =
            transformers.as_sequence().and_then(|entries| entries[0].as_sequence())
        else {
            panic!("Transformer entries should be 3-tuples, got {}", transformers);
        };
        assert_eq!(name, "scale");
        assert_eq!(scaler.class_name(), "learnkit.preprocessing.StandardScaler");
        assert_eq!(columns, &Value::List(vec![Value::Int(0), Value::Int(1)]));

        let again = codec
            .model_to_flow(rebuilt.as_ref())
            .expect("Rebuilt column transformer should encode");
        assert_eq!(again, flow);
    }

    #[test]
    fn test_keep_defaults_resets_hyperparameters() {
        let codec = codec();
        let flow = codec
            .model_to_flow(&pipeline_model())
            .expect("Pipeline should encode");

        let rebuilt = codec
            .flow_to_model_with_defaults(&flow)
            .expect("Flow should decode with defaults");
        let params = rebuilt.get_params_deep();
        assert_eq!(params["fit__alpha"], Value::Float(1.0));
        assert!(params.contains_key("scale"));
        assert!(params.contains_key("fit"));
    }

    #[test]
    fn test_foreign_family_is_rejected() {
        let codec = codec();
        let mut flow = codec
            .model_to_flow(&Ridge::default())
            .expect("Ridge should encode");
        flow.external_version = "otherkit==1.0,modelflow==0.1.0".to_string();

        match codec.flow_to_model(&flow) {
            Err(CodecError::VersionIncompatible { family, .. }) => assert_eq!(family, "learnkit"),
            other => panic!("Expected VersionIncompatible, got {:?}", other),
        }
    }

    #[test]
    fn test_unsatisfied_dependencies_are_rejected() {
        let codec = codec();
        let mut flow = codec
            .model_to_flow(&Ridge::default())
            .expect("Ridge should encode");
        flow.dependencies = "learnkit==99.0".to_string();

        match codec.flow_to_model(&flow) {
            Err(CodecError::Dependency(DependencyError::Unsatisfied { line, .. })) => {
                assert_eq!(line, "learnkit==99.0");
            }
            other => panic!("Expected an unsatisfied dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_component_referenced_twice() {
        let codec = codec();
        let mut flow = codec
            .model_to_flow(&pipeline_model())
            .expect("Pipeline should encode");
        flow.parameters.insert(
            "steps".to_string(),
            Some(format!("[{}, {}]", SCALE_REFERENCE, SCALE_REFERENCE)),
        );

        match codec.flow_to_model(&flow) {
            Err(CodecError::MalformedReference(message)) => {
                assert!(message.contains("more than once"), "Unexpected message: {}", message);
            }
            other => panic!("Expected MalformedReference, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_class_is_reported() {
        let flow = codec()
            .model_to_flow(&Ridge::default())
            .expect("Ridge should encode");
        let bare = CodecBuilder::bare().build();

        match bare.flow_to_model(&flow) {
            Err(CodecError::UnknownSymbol { kind, name }) => {
                assert_eq!(kind, SymbolKind::Estimator);
                assert_eq!(name, "learnkit.linear_model.Ridge");
            }
            other => panic!("Expected UnknownSymbol, got {:?}", other),
        }
    }

    #[test]
    fn test_flow_json_round_trip() {
        let flow = codec()
            .model_to_flow(&pipeline_model())
            .expect("Pipeline should encode");
        let json = flow.to_json().expect("Flow should serialize");
        let parsed = Flow::from_json(&json).expect("Flow JSON should parse");
        assert_eq!(parsed, flow);
    }

    #[test]
    fn test_flow_save_and_load() {
        let flow = codec()
            .model_to_flow(&search_model())
            .expect("Search should encode");
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("search.flow");

        flow.save(&path).expect("Failed to save flow");
        let loaded = Flow::from_file(&path).expect("Failed to load flow");
        assert_eq!(loaded, flow);

        let missing = Flow::from_file(dir.path().join("missing.flow"));
        assert!(matches!(missing, Err(CodecError::Storage(_))));
    }

    #[test]
    fn test_structure_and_parameter_paths() {
        let flow = codec()
            .model_to_flow(&search_model())
            .expect("Search should encode");
        let structure = flow.structure();

        assert_eq!(structure[flow.name.as_str()], Vec::<String>::new());
        assert_eq!(
            structure["learnkit.preprocessing.StandardScaler"],
            vec!["estimator", "scale"]
        );
        assert_eq!(
            flow.parameter_path("learnkit.linear_model.Ridge", "alpha")
                .expect("Ridge should be part of the tree"),
            "estimator__fit__alpha"
        );

        let mut model: Box<dyn Estimator> = Box::new(search_model());
        let path = flow
            .parameter_path("learnkit.linear_model.Ridge", "alpha")
            .expect("Ridge should be part of the tree");
        model
            .set_params([(path, Value::Float(7.0))].into_iter().collect())
            .expect("Nested parameter should be assignable");
        assert_eq!(model.get_params_deep()["estimator__fit__alpha"], Value::Float(7.0));
    }

    #[test]
    fn test_scaler_options_survive() {
        let codec = codec();
        let scaler = StandardScaler::new()
            .with_mean(false)
            .dtype(ScalarType::Float32);
        let flow = codec.model_to_flow(&scaler).expect("Scaler should encode");
        let rebuilt = codec.flow_to_model(&flow).expect("Scaler flow should decode");

        let params = rebuilt.get_params();
        assert_eq!(params["with_mean"], Value::Bool(false));
        assert_eq!(params["dtype"], Value::Type(ScalarType::Float32));
    }
}
