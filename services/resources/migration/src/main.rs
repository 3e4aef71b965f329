use sea_orm_migration::prelude::*;

use conveyor_resources_migration::Migrator;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
