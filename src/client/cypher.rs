use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use super::error::ClientError;

/// Client for the graph database's HTTP transaction endpoint. Used by the
/// maintenance commands that run raw Cypher instead of going through the
/// knowledge graph service.
pub struct CypherClient {
    http: Client,
    endpoint: String,
    user: String,
    password: String,
}

/// Rows returned by a single Cypher statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// First column of the first row, if any.
    pub fn single(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

impl CypherClient {
    pub fn new(
        uri: &str,
        user: &str,
        password: &str,
        database: &str,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/db/{}/tx/commit", uri.trim_end_matches('/'), database),
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    /// Run one auto-committed Cypher statement with parameters.
    pub async fn execute(
        &self,
        statement: &str,
        parameters: Value,
    ) -> Result<QueryResult, ClientError> {
        let parameters = match parameters {
            Value::Null => json!({}),
            other => other,
        };
        let body = json!({
            "statements": [{"statement": statement, "parameters": parameters}]
        });

        tracing::debug!(endpoint = %self.endpoint, "executing cypher statement");
        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_response(response.json().await?)
    }
}

/// Parse the transaction endpoint's response envelope. Any entry in the
/// `errors` array aborts the whole call.
fn parse_response(body: Value) -> Result<QueryResult, ClientError> {
    if let Some(error) = body["errors"].as_array().and_then(|errors| errors.first()) {
        return Err(ClientError::Database {
            code: error["code"].as_str().unwrap_or("unknown").to_string(),
            message: error["message"].as_str().unwrap_or("").to_string(),
        });
    }

    let result = match body["results"].as_array().and_then(|results| results.first()) {
        Some(result) => result,
        None => {
            return Err(ClientError::Malformed(
                "response carries neither results nor errors".to_string(),
            ))
        }
    };

    let columns = result["columns"]
        .as_array()
        .map(|columns| {
            columns
                .iter()
                .filter_map(|column| column.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let rows = result["data"]
        .as_array()
        .map(|data| {
            data.iter()
                .filter_map(|entry| entry["row"].as_array().cloned())
                .collect()
        })
        .unwrap_or_default();

    Ok(QueryResult { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn parses_rows_and_columns() {
        let body: Value = serde_json::from_str(indoc! {r#"
            {
              "results": [
                {
                  "columns": ["labels", "count"],
                  "data": [
                    {"row": [["Component"], 5], "meta": [null, null]},
                    {"row": [["Pattern"], 2], "meta": [null, null]}
                  ]
                }
              ],
              "errors": []
            }
        "#})
        .unwrap();

        let result = parse_response(body).unwrap();
        assert_eq!(result.columns, vec!["labels", "count"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0][1], 5);
        assert_eq!(result.single(), Some(&json!(["Component"])));
    }

    #[test]
    fn surfaces_database_errors() {
        let body: Value = serde_json::from_str(indoc! {r#"
            {
              "results": [],
              "errors": [
                {
                  "code": "Neo.ClientError.Statement.SyntaxError",
                  "message": "Invalid input"
                }
              ]
            }
        "#})
        .unwrap();

        let err = parse_response(body).unwrap_err();
        match err {
            ClientError::Database { code, message } => {
                assert_eq!(code, "Neo.ClientError.Statement.SyntaxError");
                assert_eq!(message, "Invalid input");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_result_set_yields_no_rows() {
        let body = json!({"results": [{"columns": ["n"], "data": []}], "errors": []});
        let result = parse_response(body).unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.single(), None);
    }

    #[test]
    fn malformed_envelope_is_an_error() {
        assert!(parse_response(json!({})).is_err());
    }

    #[test]
    fn endpoint_includes_database_path() {
        let client = CypherClient::new("http://localhost:7474/", "neo4j", "pw", "neo4j").unwrap();
        assert_eq!(client.endpoint, "http://localhost:7474/db/neo4j/tx/commit");
    }
}
