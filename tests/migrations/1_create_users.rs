use waterline::migration::{BoxError, MemoryDatabase, MigrationContext, MigrationError};

pub fn register() -> Result<(), MigrationError> {
    waterline::register!(super::MIGRATOR, up, down)
}

fn up(_ctx: &MigrationContext, db: &MemoryDatabase) -> Result<(), BoxError> {
    db.execute("CREATE TABLE users (id BIGINT PRIMARY KEY)");
    Ok(())
}

fn down(_ctx: &MigrationContext, db: &MemoryDatabase) -> Result<(), BoxError> {
    db.execute("DROP TABLE users");
    Ok(())
}
