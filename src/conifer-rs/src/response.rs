use crate::{ClientError, Result};

/// Named view of a result: exactly one of `err` / `response` is set
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub err: Option<ClientError>,
    pub response: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    pub fn into_result(self) -> Result<T> {
        match (self.err, self.response) {
            (Some(err), _) => Err(err),
            (None, Some(response)) => Ok(response),
            (None, None) => Err(ClientError::InvalidResponse),
        }
    }
}

impl<T> From<Result<T>> for ApiResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(response) => Self {
                err: None,
                response: Some(response),
            },
            Err(err) => Self {
                err: Some(err),
                response: None,
            },
        }
    }
}
