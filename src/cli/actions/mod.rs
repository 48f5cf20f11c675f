pub mod register;
pub mod server;

use anyhow::Result;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    Register(register::Args),
}

impl Action {
    /// Run the selected action.
    ///
    /// # Errors
    /// Propagates the action's failure.
    pub async fn execute(self) -> Result<()> {
        match self {
            Self::Server(args) => server::execute(args).await,
            Self::Register(args) => register::execute(args).await,
        }
    }
}
