use crate::config::Config;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{error, info};

/// Database service wrapping the PostgreSQL connection pool.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing database connection pool");

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Verify the pool can reach the server with a trivial round trip.
    pub async fn verify_connection(&self) -> Result<()> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(AppError::from(e))
            }
        }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
        info!("Database migrations applied");
        Ok(())
    }
}

/// Pagination envelope shared by list endpoints.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

impl<T> PaginatedResult<T> {
    pub fn new(data: Vec<T>, total: usize, page: usize, per_page: usize) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            data,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginated_result_page_math() {
        let result: PaginatedResult<i32> = PaginatedResult::new(vec![1, 2, 3], 45, 1, 20);
        assert_eq!(result.total_pages, 3);

        let exact: PaginatedResult<i32> = PaginatedResult::new(vec![], 40, 2, 20);
        assert_eq!(exact.total_pages, 2);

        let empty: PaginatedResult<i32> = PaginatedResult::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }
}
