mod request_id;

pub use request_id::{MakeHexRequestId, REQUEST_ID_HEADER, request_id_of};
