//! The receiver task.
//!
//! One task per connection owns the read half of the socket and the
//! streaming decoder, and routes every backend message into one of two
//! queues: `data` carries tabular results (or the error that cut them
//! short), `control` carries the filtered message stream the request API
//! correlates barriers and describe results on.
use std::mem;

use tokio::{
    io::AsyncReadExt,
    sync::mpsc::UnboundedSender,
    task::JoinHandle,
};

use crate::{
    Error, Result,
    common::verbose,
    net::ReadSocket,
    postgres::{BackendMessage, CommandResult, Decoder, backend::DataRow},
    transport::RECV_BUF,
};

/// All rows of one `Execute`, in receipt order, with its terminal marker.
///
/// `result` is the parsed `CommandComplete` tag, or [`None`] when the
/// execute was terminated by `EmptyQueryResponse`.
#[derive(Debug)]
pub struct DataMessage {
    pub rows: Vec<DataRow>,
    pub result: Option<CommandResult>,
}

/// Routes decoded messages into the data and control queues.
pub(crate) struct Dispatcher {
    rows: Vec<DataRow>,
    data: UnboundedSender<Result<DataMessage>>,
    control: UnboundedSender<BackendMessage>,
}

impl Dispatcher {
    pub(crate) fn new(
        data: UnboundedSender<Result<DataMessage>>,
        control: UnboundedSender<BackendMessage>,
    ) -> Dispatcher {
        Dispatcher { rows: Vec::new(), data, control }
    }

    /// Route one backend message.
    ///
    /// Messages are handled in strict receipt order; the queues preserve
    /// that order for their consumers. Send failures mean the consumer side
    /// is gone, which is not the receiver's problem to report.
    fn dispatch(&mut self, message: BackendMessage) {
        use BackendMessage::*;

        match message {
            DataRow(row) => self.rows.push(row),
            CommandComplete(cmd) => {
                let rows = mem::take(&mut self.rows);
                let _ = self.data.send(Ok(DataMessage { rows, result: Some(cmd.result) }));
            }
            // substitutes for CommandComplete; the accumulator is empty in
            // practice since an empty query produces no rows
            EmptyQueryResponse(_) => {
                let rows = mem::take(&mut self.rows);
                let _ = self.data.send(Ok(DataMessage { rows, result: None }));
            }
            ErrorResponse(err) => {
                self.rows.clear();
                let _ = self.control.send(ErrorResponse(err.clone()));
                let _ = self.data.send(Err(Error::database(err.diagnostic)));
            }
            message @ (NoData(_) | ParameterDescription(_) | ReadyForQuery(_)
            | RowDescription(_)) => {
                let _ = self.control.send(message);
            }
            NoticeResponse(_notice) => {
                verbose!("notice: {}", _notice.diagnostic);
            }
            // raw notification delivery only; no channel dispatch
            NotificationResponse(_) => {}
            // Execute is always sent without a row limit
            PortalSuspended(_) => {}
            // everything else is a startup phase or acknowledgement message
            // the request API has no use for
            _ => {}
        }
    }

    /// Deliver a fatal receiver error.
    ///
    /// The error is pushed onto the data queue, then both queues close as
    /// the dispatcher drops; consumers that find their queue closed observe
    /// [`ErrorKind::ConnectionClosed`][crate::ErrorKind::ConnectionClosed].
    fn fail(self, error: Error) {
        let _ = self.data.send(Err(error));
    }
}

/// Spawn the receiver task.
pub(crate) fn spawn(
    socket: ReadSocket,
    decoder: Decoder,
    dispatcher: Dispatcher,
) -> JoinHandle<()> {
    tokio::spawn(run(socket, decoder, dispatcher))
}

async fn run(mut socket: ReadSocket, mut decoder: Decoder, mut dispatcher: Dispatcher) {
    loop {
        // drain everything decodable, the startup phase may have left
        // bytes behind
        loop {
            match decoder.next() {
                Ok(Some(message)) => dispatcher.dispatch(message),
                Ok(None) => break,
                Err(err) => return dispatcher.fail(err.into()),
            }
        }

        match socket.read_buf(decoder.buf_mut(RECV_BUF)).await {
            Ok(0) => return dispatcher.fail(Error::closed()),
            Ok(_n) => {
                verbose!("read {_n} bytes");
            }
            Err(err) => return dispatcher.fail(err.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    use super::*;
    use crate::postgres::backend::{
        BindComplete, CommandComplete, DataRow, EmptyQueryResponse, ErrorResponse,
        ParameterStatus, ReadyForQuery, TransactionStatus,
    };
    use crate::postgres::{BackendProtocol, Diagnostic, Severity};

    fn dispatcher() -> (
        Dispatcher,
        UnboundedReceiver<Result<DataMessage>>,
        UnboundedReceiver<BackendMessage>,
    ) {
        let (data_tx, data_rx) = unbounded_channel();
        let (control_tx, control_rx) = unbounded_channel();
        (Dispatcher::new(data_tx, control_tx), data_rx, control_rx)
    }

    fn row(value: &'static [u8]) -> DataRow {
        DataRow { columns: vec![Some(Bytes::from_static(value))] }
    }

    fn command_complete(tag: &'static [u8]) -> CommandComplete {
        CommandComplete::decode(b'C', Bytes::from_static(tag)).unwrap()
    }

    fn error_response() -> ErrorResponse {
        ErrorResponse {
            diagnostic: Diagnostic::parse(Bytes::from_static(
                b"S\0ERROR\0C\022P02\0M\0oops\0\0",
            ))
            .unwrap(),
        }
    }

    #[test]
    fn rows_accumulate_until_command_complete() {
        let (mut dispatcher, mut data, mut control) = dispatcher();

        dispatcher.dispatch(BackendMessage::DataRow(row(b"1")));
        dispatcher.dispatch(BackendMessage::DataRow(row(b"2")));
        assert!(data.try_recv().is_err(), "no data message before terminator");

        dispatcher.dispatch(BackendMessage::CommandComplete(command_complete(b"SELECT 2\0")));

        let message = data.try_recv().unwrap().unwrap();
        assert_eq!(message.rows, vec![row(b"1"), row(b"2")]);
        assert_eq!(message.result, Some(CommandResult::Select { rows: 2 }));

        // rows and completions stay off the control queue
        assert!(control.try_recv().is_err());
    }

    #[test]
    fn empty_query_terminates_like_command_complete() {
        let (mut dispatcher, mut data, _control) = dispatcher();

        dispatcher.dispatch(BackendMessage::EmptyQueryResponse(EmptyQueryResponse));

        let message = data.try_recv().unwrap().unwrap();
        assert!(message.rows.is_empty());
        assert_eq!(message.result, None);
    }

    #[test]
    fn error_discards_rows_and_reaches_both_queues() {
        let (mut dispatcher, mut data, mut control) = dispatcher();

        dispatcher.dispatch(BackendMessage::DataRow(row(b"1")));
        dispatcher.dispatch(BackendMessage::ErrorResponse(error_response()));

        let err = data.try_recv().unwrap().unwrap_err();
        let diagnostic = err.diagnostic().expect("database error");
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.code, "22P02");

        assert!(matches!(
            control.try_recv().unwrap(),
            BackendMessage::ErrorResponse(_),
        ));

        // accumulator was discarded; the next terminator yields no rows
        dispatcher.dispatch(BackendMessage::CommandComplete(command_complete(b"SELECT 0\0")));
        assert!(data.try_recv().unwrap().unwrap().rows.is_empty());
    }

    #[test]
    fn filter_admits_control_messages_only() {
        let (mut dispatcher, _data, mut control) = dispatcher();

        dispatcher.dispatch(BackendMessage::BindComplete(BindComplete));
        dispatcher.dispatch(BackendMessage::ParameterStatus(ParameterStatus {
            name: "TimeZone".into(),
            value: "UTC".into(),
        }));
        assert!(control.try_recv().is_err(), "excluded messages do not pass");

        dispatcher.dispatch(BackendMessage::ReadyForQuery(ReadyForQuery {
            status: TransactionStatus::Idle,
        }));
        assert!(matches!(
            control.try_recv().unwrap(),
            BackendMessage::ReadyForQuery(_),
        ));
    }
}
