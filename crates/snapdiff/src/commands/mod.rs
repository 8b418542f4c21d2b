mod approve;
mod compare;
mod init;

pub use self::approve::approve;
pub use self::compare::compare;
pub use self::init::init;
pub use self::test::test;
