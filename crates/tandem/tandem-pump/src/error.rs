use tandem_ring::RingError;

#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    #[error("i/o error")]
    Io(#[from] std::io::Error),

    #[error("ring transaction failed")]
    Ring(#[from] RingError),

    #[error("sink accepted zero bytes")]
    WriteZero,

    #[error("{0} thread panicked")]
    Panicked(&'static str),
}
