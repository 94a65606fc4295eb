//! Request translation: body shape checks, per-row feature validation and
//! construction of the ordered model input.

use serde_json::{Map, Value};

use crate::errors::{ServeError, ServeResult};
use crate::feature_schema::FeatureSchema;

pub type Row = Map<String, Value>;

/// A `/predict` body after shape validation.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRequest {
    /// `{"features": {...}}`
    Single(Row),
    /// `{"instances": [{...}, ...]}`, never empty
    Batch(Vec<Row>),
}

impl PredictionRequest {
    /// Validate the outer shape of a parsed body.
    ///
    /// `features` is looked at first and wins when both keys are present.
    pub fn from_body(body: Value) -> ServeResult<Self> {
        let Value::Object(mut body) = body else {
            return Err(ServeError::bad_request());
        };

        if let Some(features) = body.remove("features") {
            return match features {
                Value::Object(row) => Ok(Self::Single(row)),
                _ => Err(ServeError::bad_request()),
            };
        }

        match body.remove("instances") {
            Some(Value::Array(items)) if !items.is_empty() => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    _ => Err(ServeError::bad_request()),
                })
                .collect::<ServeResult<Vec<_>>>()
                .map(Self::Batch),
            _ => Err(ServeError::bad_request()),
        }
    }

    /// Parse raw request bytes. Anything that is not JSON counts as `{}`.
    pub fn from_slice(bytes: &[u8]) -> ServeResult<Self> {
        let body = serde_json::from_slice(bytes).unwrap_or_else(|_| Value::Object(Map::new()));
        Self::from_body(body)
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            Self::Single(row) => std::slice::from_ref(row),
            Self::Batch(rows) => rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}

/// Row-major model input, columns in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct InputMatrix {
    width: usize,
    rows: Vec<Vec<Value>>,
}

impl InputMatrix {
    pub fn with_capacity(width: usize, rows: usize) -> Self {
        Self {
            width,
            rows: Vec::with_capacity(rows),
        }
    }

    /// Wrap prepared rows; every row must already be `width` long.
    pub fn from_rows(width: usize, rows: Vec<Vec<Value>>) -> ServeResult<Self> {
        if let Some(bad) = rows.iter().position(|row| row.len() != width) {
            return Err(ServeError::inference(format!(
                "row {bad} has {} values, expected {width}",
                rows[bad].len()
            )));
        }
        Ok(Self { width, rows })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Schema names absent from `row`, in schema order.
pub fn missing_features(schema: &FeatureSchema, row: &Row) -> Vec<String> {
    schema
        .names()
        .iter()
        .filter(|name| !row.contains_key(name.as_str()))
        .cloned()
        .collect()
}

/// Select the row's values in schema order. Extra keys are ignored.
pub fn build_row(schema: &FeatureSchema, row: &Row) -> ServeResult<Vec<Value>> {
    let missing = missing_features(schema, row);
    if !missing.is_empty() {
        return Err(ServeError::missing_features(missing));
    }
    Ok(schema
        .names()
        .iter()
        .map(|name| row[name.as_str()].clone())
        .collect())
}

/// Build the model input for a whole request.
///
/// The first row that fails validation aborts the request; only that row's
/// missing names are reported.
pub fn build_matrix(schema: &FeatureSchema, request: &PredictionRequest) -> ServeResult<InputMatrix> {
    let mut matrix = InputMatrix::with_capacity(schema.len(), request.len());
    for (index, row) in request.rows().iter().enumerate() {
        let values = build_row(schema, row).inspect_err(|_| {
            tracing::debug!(row = index, "row failed feature validation");
        })?;
        matrix.rows.push(values);
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::REQUEST_SHAPE_MESSAGE;
    use serde_json::json;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec!["age".into(), "tenure".into()]).unwrap()
    }

    fn assert_shape_rejected(body: Value) {
        let err = PredictionRequest::from_body(body.clone()).unwrap_err();
        assert_eq!(err.to_string(), REQUEST_SHAPE_MESSAGE, "{body}");
    }

    #[test]
    fn test_request_shapes() {
        let single = PredictionRequest::from_body(json!({"features": {"age": 1}})).unwrap();
        assert!(matches!(single, PredictionRequest::Single(_)));
        assert_eq!(single.len(), 1);

        let batch =
            PredictionRequest::from_body(json!({"instances": [{"age": 1}, {"age": 2}]})).unwrap();
        assert!(matches!(batch, PredictionRequest::Batch(_)));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_bad_shapes_get_guidance() {
        assert_shape_rejected(json!({}));
        assert_shape_rejected(json!({"rows": []}));
        assert_shape_rejected(json!({"instances": []}));
        assert_shape_rejected(json!({"instances": {"age": 1}}));
        assert_shape_rejected(json!({"instances": [{"age": 1}, 7]}));
        assert_shape_rejected(json!({"features": [34, 5]}));
        assert_shape_rejected(json!({"features": null, "instances": [{"age": 1}]}));
        assert_shape_rejected(json!([{"age": 1}]));
        assert_shape_rejected(json!("features"));
    }

    #[test]
    fn test_unparseable_body_counts_as_empty() {
        let err = PredictionRequest::from_slice(b"{not json").unwrap_err();
        assert_eq!(err.to_string(), REQUEST_SHAPE_MESSAGE);

        let err = PredictionRequest::from_slice(b"").unwrap_err();
        assert_eq!(err.to_string(), REQUEST_SHAPE_MESSAGE);
    }

    #[test]
    fn test_features_wins_over_instances() {
        let request = PredictionRequest::from_body(json!({
            "instances": [{"age": 1, "tenure": 1}, {"age": 2, "tenure": 2}],
            "features": {"age": 9, "tenure": 9}
        }))
        .unwrap();
        assert_eq!(request.len(), 1);
        assert_eq!(request.rows()[0]["age"], json!(9));
    }

    #[test]
    fn test_row_is_built_in_schema_order() {
        let row = json!({"tenure": 5, "plan": "gold", "age": 34});
        let values = build_row(&schema(), row.as_object().unwrap()).unwrap();
        assert_eq!(values, vec![json!(34), json!(5)]);
    }

    #[test]
    fn test_every_missing_name_is_reported() {
        let row = json!({"plan": "gold"});
        let err = build_row(&schema(), row.as_object().unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required features: ['age', 'tenure']"
        );
    }

    #[test]
    fn test_batch_aborts_on_first_bad_row() {
        let request = PredictionRequest::from_body(json!({"instances": [
            {"age": 1, "tenure": 2},
            {"age": 3},
            {"tenure": 4}
        ]}))
        .unwrap();
        let err = build_matrix(&schema(), &request).unwrap_err();
        match err {
            ServeError::MissingFeatures { missing } => assert_eq!(missing, vec!["tenure"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_matrix_preserves_row_order() {
        let request = PredictionRequest::from_body(json!({"instances": [
            {"age": 1, "tenure": 2},
            {"age": 3, "tenure": 4, "ignored": true}
        ]}))
        .unwrap();
        let matrix = build_matrix(&schema(), &request).unwrap();
        assert_eq!(matrix.width(), 2);
        assert_eq!(
            matrix.rows(),
            &[vec![json!(1), json!(2)], vec![json!(3), json!(4)]]
        );
    }

    #[test]
    fn test_from_rows_checks_width() {
        assert!(InputMatrix::from_rows(2, vec![vec![json!(1), json!(2)]]).is_ok());
        assert!(InputMatrix::from_rows(2, vec![vec![json!(1)]]).is_err());
    }
}
