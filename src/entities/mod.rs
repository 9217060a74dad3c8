pub mod commerce;

pub use crate::auth::user::{Entity as User, Model as UserModel};
