use waterline::migration::{BoxError, MemoryDatabase, MigrationContext, MigrationError};

// irreversible: no down function
pub fn register() -> Result<(), MigrationError> {
    waterline::register!(super::MIGRATOR, up)
}

fn up(_ctx: &MigrationContext, db: &MemoryDatabase) -> Result<(), BoxError> {
    db.execute("ALTER TABLE users ADD COLUMN email TEXT");
    Ok(())
}
