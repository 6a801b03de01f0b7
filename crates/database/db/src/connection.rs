/// The [`DatabaseConnectionProvider`] trait provides a way to get a connection to the database.
/// This is implemented by the [`crate::Database`] type.
pub trait DatabaseConnectionProvider {
    /// The connection type.
    type Connection: sea_orm::ConnectionTrait + Sync;

    /// Returns a reference to the database connection.
    fn get_connection(&self) -> &Self::Connection;
}
