//! Personal Finance API - Main Application Entry Point
//!
//! This is a REST API server for tracking personal finances: incomes,
//! expenses, recurring schedules, category budgets with alert webhooks,
//! savings goals fed by monthly surplus, CSV imports and chart-ready
//! analytics.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: Bearer session tokens with SHA-256 hashing
//! - **Format**: JSON requests/responses (CSV imports take raw bodies)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use state::AppState;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };

    // Create authenticated routes (API endpoints)
    let authenticated_routes = Router::new()
        // Session management
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        // Income routes
        .route("/api/v1/incomes", get(handlers::incomes::list_incomes))
        .route("/api/v1/incomes", post(handlers::incomes::create_income))
        .route(
            "/api/v1/incomes",
            delete(handlers::incomes::delete_all_incomes),
        )
        .route(
            "/api/v1/incomes/{id}",
            put(handlers::incomes::update_income),
        )
        .route(
            "/api/v1/incomes/{id}",
            delete(handlers::incomes::delete_income),
        )
        .route(
            "/api/v1/incomes/delete-selected",
            post(handlers::incomes::delete_selected_incomes),
        )
        // Expense routes
        .route("/api/v1/expenses", get(handlers::expenses::list_expenses))
        .route(
            "/api/v1/expenses",
            post(handlers::expenses::create_expense),
        )
        .route(
            "/api/v1/expenses",
            delete(handlers::expenses::delete_all_expenses),
        )
        .route(
            "/api/v1/expenses/{id}",
            put(handlers::expenses::update_expense),
        )
        .route(
            "/api/v1/expenses/{id}",
            delete(handlers::expenses::delete_expense),
        )
        .route(
            "/api/v1/expenses/delete-selected",
            post(handlers::expenses::delete_selected_expenses),
        )
        // Recurring schedule routes
        .route(
            "/api/v1/recurring/incomes",
            get(handlers::recurring::list_recurring_incomes)
                .post(handlers::recurring::create_recurring_income),
        )
        .route(
            "/api/v1/recurring/incomes/{id}",
            put(handlers::recurring::update_recurring_income)
                .delete(handlers::recurring::delete_recurring_income),
        )
        .route(
            "/api/v1/recurring/expenses",
            get(handlers::recurring::list_recurring_expenses)
                .post(handlers::recurring::create_recurring_expense),
        )
        .route(
            "/api/v1/recurring/expenses/{id}",
            put(handlers::recurring::update_recurring_expense)
                .delete(handlers::recurring::delete_recurring_expense),
        )
        // Budget routes
        .route(
            "/api/v1/budgets",
            get(handlers::budgets::list_budgets).post(handlers::budgets::create_budget),
        )
        .route(
            "/api/v1/budgets/{id}",
            get(handlers::budgets::get_budget)
                .put(handlers::budgets::update_budget)
                .delete(handlers::budgets::delete_budget),
        )
        // Savings goal routes
        .route(
            "/api/v1/goals",
            get(handlers::goals::goals_dashboard)
                .post(handlers::goals::create_goal)
                .delete(handlers::goals::delete_all_goals),
        )
        .route(
            "/api/v1/goals/{id}",
            put(handlers::goals::update_goal).delete(handlers::goals::delete_goal),
        )
        .route(
            "/api/v1/goals/delete-selected",
            post(handlers::goals::delete_selected_goals),
        )
        // Category routes
        .route(
            "/api/v1/categories/expense",
            get(handlers::categories::list_expense_categories),
        )
        .route(
            "/api/v1/categories/income",
            get(handlers::categories::list_income_categories),
        )
        .route(
            "/api/v1/categories/expense/predict",
            get(handlers::categories::predict_expense_category),
        )
        .route(
            "/api/v1/categories/income/predict",
            get(handlers::categories::predict_income_category),
        )
        // Analytics routes
        .route(
            "/api/v1/analytics/dashboard",
            get(handlers::analytics::dashboard),
        )
        .route(
            "/api/v1/analytics/expenses",
            get(handlers::analytics::expense_series),
        )
        .route(
            "/api/v1/analytics/incomes",
            get(handlers::analytics::income_series),
        )
        // CSV import routes
        .route(
            "/api/v1/imports/incomes",
            post(handlers::imports::import_incomes),
        )
        .route(
            "/api/v1/imports/expenses",
            post(handlers::imports::import_expenses),
        )
        .route(
            "/api/v1/imports/bank-statement",
            post(handlers::imports::import_bank_statement),
        )
        // Alert endpoint routes
        .route(
            "/api/v1/alerts",
            get(handlers::alerts::list_alerts).post(handlers::alerts::create_alert),
        )
        .route(
            "/api/v1/alerts/{id}",
            delete(handlers::alerts::delete_alert),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            pool.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine authenticated routes with public routes
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Browser frontends call this API from another origin
        .layer(CorsLayer::permissive())
        // Share pool and config with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
