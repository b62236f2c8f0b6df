use little_lemon_api::{
    config,
    db::{create_orm_conn, run_migrations},
    services::group_service::ensure_default_groups,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = config::database_url()?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    ensure_default_groups(&orm).await?;
    println!("Migrations applied");
    Ok(())
}
