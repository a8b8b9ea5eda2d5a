use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "classpoll";

#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
}

impl MongoConfig {
    /// Parse a connection string; the database defaults to `classpoll`.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DATABASE).to_owned();
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        options.app_name.get_or_insert_with(|| "classpoll-back".to_owned());

        Ok(Self {
            options,
            database_name,
        })
    }
}
