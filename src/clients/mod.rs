pub mod generation_client;

pub use generation_client::{
    GenerationClient, HttpTransport, Transport, TransportResponse, SUCCESS_STATUS,
};
