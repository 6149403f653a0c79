//! Dotted-path access into nested config trees.
//!
//! A path such as `model.backbone.stages.2.depth` walks mappings by key and
//! sequences by integer index; a negative index counts from the end, so
//! `layers.-1.dim` names the last layer. Every segment, the last one
//! included, must already exist: injection replaces values, it never creates
//! them.

use serde_json::Value;

use ht_search::Candidate;
use ht_types::InjectError;

/// Read the value at `key`.
pub fn lookup<'a>(cfg: &'a Value, key: &str) -> Result<&'a Value, InjectError> {
    if key.is_empty() {
        return Err(InjectError::EmptyPath);
    }
    let mut node = cfg;
    let mut walked = String::new();
    for segment in key.split('.') {
        node = match node {
            Value::Object(map) => map.get(segment).ok_or_else(|| missing(segment, &walked))?,
            Value::Array(items) => &items[resolve_index(segment, items.len(), &walked)?],
            _ => return Err(not_a_container(&walked)),
        };
        advance(&mut walked, segment);
    }
    Ok(node)
}

/// Replace the value at `key` with `value`.
pub fn inject(cfg: &mut Value, key: &str, value: Value) -> Result<(), InjectError> {
    if key.is_empty() {
        return Err(InjectError::EmptyPath);
    }
    let mut node = cfg;
    let mut walked = String::new();
    for segment in key.split('.') {
        node = match node {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| missing(segment, &walked))?,
            Value::Array(items) => {
                let index = resolve_index(segment, items.len(), &walked)?;
                &mut items[index]
            }
            _ => return Err(not_a_container(&walked)),
        };
        advance(&mut walked, segment);
    }
    *node = value;
    Ok(())
}

/// Deep-copy `base` and inject every value of `candidate` into the copy.
pub fn inject_candidate(base: &Value, candidate: &Candidate) -> Result<Value, InjectError> {
    let mut cfg = base.clone();
    for (key, value) in candidate {
        inject(&mut cfg, key, value.to_json())?;
    }
    Ok(cfg)
}

fn advance(walked: &mut String, segment: &str) {
    if !walked.is_empty() {
        walked.push('.');
    }
    walked.push_str(segment);
}

fn location(walked: &str) -> String {
    if walked.is_empty() {
        "<root>".to_string()
    } else {
        walked.to_string()
    }
}

/// Position in a sequence of `len` items named by `segment`. Always in range.
fn resolve_index(segment: &str, len: usize, walked: &str) -> Result<usize, InjectError> {
    let index: i64 = segment.parse().map_err(|_| InjectError::InvalidIndex {
        segment: segment.to_string(),
        path: location(walked),
    })?;
    let resolved = if index < 0 {
        usize::try_from(index.unsigned_abs())
            .ok()
            .and_then(|back| len.checked_sub(back))
    } else {
        usize::try_from(index).ok().filter(|i| *i < len)
    };
    resolved.ok_or_else(|| InjectError::IndexOutOfRange {
        index,
        len,
        path: location(walked),
    })
}

fn missing(segment: &str, walked: &str) -> InjectError {
    InjectError::MissingKey {
        segment: segment.to_string(),
        path: location(walked),
    }
}

fn not_a_container(walked: &str) -> InjectError {
    InjectError::NotAContainer {
        path: location(walked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_search::ParameterValue;
    use serde_json::json;

    #[test]
    fn inject_replaces_nested_value() {
        let mut cfg = json!({"x": {"y": 3, "z": 1}});
        inject(&mut cfg, "x.y", json!(7)).unwrap();
        assert_eq!(cfg, json!({"x": {"y": 7, "z": 1}}));
    }

    #[test]
    fn numeric_segments_index_sequences() {
        let mut cfg = json!({"a": {"b": [{"c": 0}, {"c": 1}, {"c": 2}]}});
        inject(&mut cfg, "a.b.2.c", json!("deep")).unwrap();
        assert_eq!(cfg["a"]["b"][2]["c"], json!("deep"));
        assert_eq!(lookup(&cfg, "a.b.0.c").unwrap(), &json!(0));

        inject(&mut cfg, "a.b.1", json!(null)).unwrap();
        assert_eq!(cfg["a"]["b"][1], json!(null));
    }

    #[test]
    fn missing_intermediate_segment_fails() {
        let mut cfg = json!({"x": {"y": 3}});
        let err = inject(&mut cfg, "x.w.q", json!(1)).unwrap_err();
        assert_eq!(
            err,
            InjectError::MissingKey {
                segment: "w".into(),
                path: "x".into()
            }
        );
        assert_eq!(cfg, json!({"x": {"y": 3}}));
    }

    #[test]
    fn final_segment_must_exist() {
        let mut cfg = json!({"optimizer": {"lr": 0.1}});
        let err = inject(&mut cfg, "optimizer.momentum", json!(0.9)).unwrap_err();
        assert!(matches!(err, InjectError::MissingKey { ref segment, .. } if segment == "momentum"));

        let err = lookup(&cfg, "scheduler").unwrap_err();
        assert_eq!(
            err,
            InjectError::MissingKey {
                segment: "scheduler".into(),
                path: "<root>".into()
            }
        );
    }

    #[test]
    fn sequence_segment_errors() {
        let mut cfg = json!({"stages": [1, 2]});
        assert_eq!(
            inject(&mut cfg, "stages.5", json!(0)).unwrap_err(),
            InjectError::IndexOutOfRange {
                index: 5,
                len: 2,
                path: "stages".into()
            }
        );
        assert!(matches!(
            inject(&mut cfg, "stages.first", json!(0)).unwrap_err(),
            InjectError::InvalidIndex { .. }
        ));
        assert_eq!(
            inject(&mut cfg, "stages.0.depth", json!(0)).unwrap_err(),
            InjectError::NotAContainer {
                path: "stages.0".into()
            }
        );
        assert_eq!(lookup(&cfg, "").unwrap_err(), InjectError::EmptyPath);
    }

    #[test]
    fn negative_segments_count_from_the_end() {
        let mut cfg = json!({"layers": [{"dim": 64}, {"dim": 128}, {"dim": 256}]});
        inject(&mut cfg, "layers.-1.dim", json!(512)).unwrap();
        assert_eq!(cfg["layers"][2]["dim"], json!(512));
        assert_eq!(lookup(&cfg, "layers.-3.dim").unwrap(), &json!(64));

        assert_eq!(
            inject(&mut cfg, "layers.-4.dim", json!(0)).unwrap_err(),
            InjectError::IndexOutOfRange {
                index: -4,
                len: 3,
                path: "layers".into()
            }
        );
        assert!(matches!(
            lookup(&json!({"empty": []}), "empty.-1").unwrap_err(),
            InjectError::IndexOutOfRange { index: -1, len: 0, .. }
        ));
    }

    #[test]
    fn inject_candidate_leaves_base_untouched() {
        let base = json!({"optimizer": {"lr": 0.1, "type": "SGD"}, "model": {"depth": 18}});
        let mut candidate = Candidate::new();
        candidate.insert("optimizer.lr".into(), ParameterValue::Float(0.01));
        candidate.insert("model.depth".into(), ParameterValue::Int(50));

        let cfg = inject_candidate(&base, &candidate).unwrap();
        assert_eq!(
            cfg,
            json!({"optimizer": {"lr": 0.01, "type": "SGD"}, "model": {"depth": 50}})
        );
        assert_eq!(base["optimizer"]["lr"], json!(0.1));
    }
}
