use serde::Deserialize;

/// Settings for a built router and anything serving it.
///
/// Every field has a default, so a partial config can be deserialized from any serde format.
///
/// ```rust
/// use ptsq::Config;
///
/// let config: Config = serde_json::from_str(r#"{ "title": "Api", "exposeInternalErrors": true }"#).unwrap();
/// assert_eq!(config.get_title(), "Api");
/// assert_eq!(config.get_call_path(), "/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub(crate) title: String,
    pub(crate) schema_dialect: String,
    pub(crate) call_path: String,
    pub(crate) introspection_path: String,
    pub(crate) expose_internal_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "BaseRouter".into(),
            schema_dialect: "https://json-schema.org/draft/2019-09/schema#".into(),
            call_path: "/".into(),
            introspection_path: "/introspection".into(),
            expose_internal_errors: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Default::default()
    }

    /// The `title` of the introspection document.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// The `$schema` of the introspection document.
    pub fn schema_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.schema_dialect = dialect.into();
        self
    }

    pub fn call_path(mut self, path: impl Into<String>) -> Self {
        self.call_path = path.into();
        self
    }

    pub fn introspection_path(mut self, path: impl Into<String>) -> Self {
        self.introspection_path = path.into();
        self
    }

    /// Send the message and info of `INTERNAL_SERVER_ERROR`s to clients.
    /// When disabled this covers every internal error, including ones a resolver returns on purpose with [`PtsqError::internal`](crate::PtsqError::internal).
    /// Only enable this during development.
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    pub fn get_title(&self) -> &str {
        &self.title
    }

    pub fn get_schema_dialect(&self) -> &str {
        &self.schema_dialect
    }

    pub fn get_call_path(&self) -> &str {
        &self.call_path
    }

    pub fn get_introspection_path(&self) -> &str {
        &self.introspection_path
    }

    pub fn get_expose_internal_errors(&self) -> bool {
        self.expose_internal_errors
    }
}
