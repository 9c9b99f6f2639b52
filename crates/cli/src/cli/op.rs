use std::error::Error;
use std::path::PathBuf;

use common::crypto::Password;

use crate::state::{AppState, Services, StateError};

#[derive(Clone)]
pub struct OpContext {
    /// Optional custom state path (defaults to ~/.keysplit)
    pub config_path: Option<PathBuf>,
    /// Password from `--password` or `KEYSPLIT_PASSWORD`
    pub password: Option<Password>,
}

impl OpContext {
    pub fn new(config_path: Option<PathBuf>, password: Option<String>) -> Self {
        Self {
            config_path,
            password: password.map(Password::new),
        }
    }

    pub fn load_state(&self) -> Result<AppState, StateError> {
        AppState::load(self.config_path.clone())
    }

    /// Load the state directory and open everything behind it
    pub async fn services(&self) -> Result<Services, StateError> {
        self.load_state()?.services(self.password.clone()).await
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
