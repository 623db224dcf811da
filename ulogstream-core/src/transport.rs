//! Link abstraction and the blocking session driver

use crate::error::StreamError;
use crate::types::{ControlCommand, Inbound};
use core::time::Duration;

#[cfg(feature = "std")]
use crate::{
    reassembler::StreamPhase,
    session::{Session, SessionConfig, SessionEvent, SessionStats},
    sink::OutputSink,
};

#[cfg(all(feature = "std", feature = "logging"))]
use tracing::{debug, info};

/// The link to the log producer
pub trait Transport {
    /// Send a control request to the producer
    fn send_command(&mut self, command: ControlCommand) -> Result<(), StreamError>;

    /// Wait up to `timeout` for the next message.
    ///
    /// `Ok(None)` means nothing arrived in time; it is not an error.
    fn recv(&mut self, timeout: Duration) -> Result<Option<Inbound>, StreamError>;

    /// Acknowledge the chunk with the given sequence number
    fn send_ack(&mut self, sequence: u16) -> Result<(), StreamError>;

    /// Whether the link has no more messages to deliver
    fn is_closed(&self) -> bool {
        false
    }
}

/// Run a complete streaming session over `transport`.
///
/// Sends the start request, processes messages until `should_stop` returns
/// true or the transport closes, then sends the stop request. The stop
/// request is sent even when the session fails.
#[cfg(feature = "std")]
pub fn run_session<T, S, F>(
    transport: &mut T,
    sink: S,
    config: SessionConfig,
    mut should_stop: F,
) -> Result<(S, SessionStats), StreamError>
where
    T: Transport,
    S: OutputSink,
    F: FnMut() -> bool,
{
    let started = std::time::Instant::now();
    let mut session = Session::new(sink, config);

    #[cfg(feature = "logging")]
    info!("Starting log...");

    transport.send_command(ControlCommand::StartLogging)?;

    let result = drive(transport, &mut session, started, &mut should_stop);

    #[cfg(feature = "logging")]
    info!("Stopping log");

    let stopped = transport.send_command(ControlCommand::StopLogging);
    result?;
    stopped?;

    session.finish()
}

#[cfg(feature = "std")]
fn drive<T, S, F>(
    transport: &mut T,
    session: &mut Session<S>,
    started: std::time::Instant,
    should_stop: &mut F,
) -> Result<(), StreamError>
where
    T: Transport,
    S: OutputSink,
    F: FnMut() -> bool,
{
    while !should_stop() {
        match transport.recv(session.config().recv_timeout)? {
            Some(inbound) => {
                let was_streaming = session.phase() == StreamPhase::Streaming;

                if let SessionEvent::Chunk(disposition) = session.handle(inbound)? {
                    if let Some(sequence) = disposition.ack {
                        #[cfg(feature = "logging")]
                        debug!("Acknowledging chunk {}", sequence);

                        transport.send_ack(sequence)?;
                    }
                }

                if !was_streaming && session.phase() == StreamPhase::Streaming {
                    #[cfg(feature = "logging")]
                    info!(
                        "Header received in {:.2}s",
                        started.elapsed().as_secs_f64()
                    );
                }
            }
            None => {
                if transport.is_closed() {
                    #[cfg(feature = "logging")]
                    debug!("Transport closed");

                    break;
                }
            }
        }

        session.check_start_timeout(started.elapsed())?;
    }

    Ok(())
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::constants::{PREAMBLE_LEN, ULOG_MAGIC};
    use crate::types::{Chunk, Record};
    use bytes::Bytes;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedLink {
        inbound: VecDeque<Inbound>,
        commands: Vec<ControlCommand>,
        acks: Vec<u16>,
        keep_open: bool,
    }

    impl Transport for ScriptedLink {
        fn send_command(&mut self, command: ControlCommand) -> Result<(), StreamError> {
            self.commands.push(command);
            Ok(())
        }

        fn recv(&mut self, _timeout: Duration) -> Result<Option<Inbound>, StreamError> {
            Ok(self.inbound.pop_front())
        }

        fn send_ack(&mut self, sequence: u16) -> Result<(), StreamError> {
            self.acks.push(sequence);
            Ok(())
        }

        fn is_closed(&self) -> bool {
            !self.keep_open && self.inbound.is_empty()
        }
    }

    fn preamble_chunk() -> Chunk {
        let mut data = ULOG_MAGIC.to_vec();
        data.resize(PREAMBLE_LEN, 0);
        data.extend_from_slice(Record::encode(b'F', b"def").unwrap().as_bytes());
        Chunk::new(0, Bytes::from(data), PREAMBLE_LEN as u8).acked()
    }

    #[test]
    fn test_run_session_acks_and_commands() {
        let mut link = ScriptedLink::default();
        link.inbound.push_back(Inbound::CommandAck {
            command: ControlCommand::StartLogging,
            result: 0,
        });
        link.inbound.push_back(Inbound::Data(preamble_chunk()));
        link.inbound.push_back(Inbound::Data(preamble_chunk()));
        let rec = Record::encode(b'D', b"data").unwrap();
        link.inbound
            .push_back(Inbound::Data(Chunk::new(1, rec.into_bytes(), 0)));

        let (sink, stats) =
            run_session(&mut link, Vec::new(), SessionConfig::default(), || false).unwrap();

        assert_eq!(
            link.commands,
            vec![ControlCommand::StartLogging, ControlCommand::StopLogging]
        );
        assert_eq!(link.acks, vec![0]);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(sink.len(), PREAMBLE_LEN + 6 + 7);
    }

    #[test]
    fn test_run_session_rejected_start_still_stops() {
        let mut link = ScriptedLink::default();
        link.inbound.push_back(Inbound::CommandAck {
            command: ControlCommand::StartLogging,
            result: 1,
        });

        let result = run_session(&mut link, Vec::new(), SessionConfig::default(), || false);

        assert!(matches!(result, Err(StreamError::StartRejected(1))));
        assert_eq!(link.commands.last(), Some(&ControlCommand::StopLogging));
    }

    #[test]
    fn test_run_session_start_timeout() {
        // the producer never answers and the link stays up
        let mut link = ScriptedLink {
            keep_open: true,
            ..Default::default()
        };
        let config = SessionConfig::new()
            .start_timeout(Duration::ZERO)
            .recv_timeout(Duration::from_millis(1));

        let result = run_session(&mut link, Vec::new(), config, || false);

        assert!(matches!(result, Err(StreamError::StartTimeout { .. })));
        assert_eq!(
            link.commands,
            vec![ControlCommand::StartLogging, ControlCommand::StopLogging]
        );
    }

    #[test]
    fn test_run_session_acked_chunks_do_not_start_logging() {
        let mut link = ScriptedLink {
            keep_open: true,
            ..Default::default()
        };
        link.inbound.push_back(Inbound::Data(preamble_chunk()));
        let config = SessionConfig::new().start_timeout(Duration::ZERO);

        let result = run_session(&mut link, Vec::new(), config, || false);

        assert!(matches!(result, Err(StreamError::StartTimeout { .. })));
        assert_eq!(link.acks, vec![0]);
    }

    #[test]
    fn test_run_session_stop_flag() {
        let mut link = ScriptedLink::default();
        link.inbound.push_back(Inbound::Data(preamble_chunk()));

        let (sink, stats) =
            run_session(&mut link, Vec::new(), SessionConfig::default(), || true).unwrap();

        assert!(sink.is_empty());
        assert_eq!(stats.chunks_received, 0);
    }
}
