pub use errors::*;
pub use listener::*;
pub use memory::*;
pub use store::*;

mod errors;
mod listener;
mod memory;
mod store;

#[cfg(any(test, feature = "testing"))]
pub mod tests {
    use super::*;
    use async_trait::async_trait;
    use fx_callback::{Callback, Subscription};
    use mockall::mock;

    mock! {
        #[derive(Debug)]
        pub SessionStore {}

        #[async_trait]
        impl SessionStore for SessionStore {
            async fn get(&self, id: &str) -> Result<StreamSession>;
            async fn set_status(&self, id: &str, status: SessionStatus) -> Result<()>;
        }

        impl Callback<SessionEvent> for SessionStore {
            fn subscribe(&self) -> Subscription<SessionEvent>;
        }
    }
}
