mod socket;

pub(crate) use socket::{ReadSocket, Socket, WriteSocket};
