//! Receiver com reconexão: transforma um transporte instável em linhas
//! entregues a handlers.
//!
//! ```text
//!  Disconnected ──initialize() ok──▶ Connected ──receive()──▶ handlers
//!       ▲                               │
//!       └──── erro + reconnect_delay ───┤
//!                                       └── erro sem reconexão ──▶ Stopped
//! ```
//!
//! `stop()` é cooperativo: o flag é checado a cada iteração e o transporte
//! deve usar leituras com timeout curto para limitar a latência.

use crate::error::{HandlerError, TransportError};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, TryFromFloatSecsError};
use tracing::{debug, error, info, warn};

/// Fatia máxima de sono durante a espera de reconexão.
const STOP_POLL: Duration = Duration::from_millis(200);

/// Dados brutos lidos do transporte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Origem (porta serial ou IP do remetente)
    pub source: String,
    /// Texto recebido; pode conter várias linhas
    pub data: String,
}

/// Capacidade mínima de um transporte (serial, UDP, mock de teste).
pub trait Transport: Send {
    /// Descrição legível do alvo (ex: `/dev/ttyACM0`, `udp:8600`).
    fn target(&self) -> String;

    /// Abre a conexão. Pode ser chamado de novo após uma falha.
    fn initialize(&mut self) -> Result<(), TransportError>;

    /// Lê o próximo bloco. `Ok(None)` indica timeout, que é normal.
    fn receive(&mut self) -> Result<Option<Chunk>, TransportError>;

    /// Descarta a conexão atual após uma falha.
    fn close(&mut self) {}
}

/// Estado do loop de recepção.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Disconnected,
    Connected,
    Stopped,
}

/// Configuração imutável de um receiver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverConfig {
    /// Espera antes de reconectar; `None` encerra no primeiro erro
    pub reconnect_delay: Option<Duration>,
}

impl ReceiverConfig {
    /// Converte o timeout da linha de comando (segundos, negativo = sem retry).
    ///
    /// NaN, infinito ou valor grande demais para um `Duration` é erro.
    pub fn from_reconnect_secs(secs: f64) -> Result<Self, TryFromFloatSecsError> {
        let reconnect_delay = if secs < 0.0 {
            None
        } else {
            Some(Duration::try_from_secs_f64(secs)?)
        };
        Ok(Self { reconnect_delay })
    }
}

/// Linha entregue aos handlers.
#[derive(Debug, Clone, Copy)]
pub struct ReceivedLine<'a> {
    pub source: &'a str,
    pub line: &'a str,
    /// Tempo desde o bloco anterior neste receiver
    pub elapsed: Option<Duration>,
}

/// Consumidor de linhas recebidas.
pub trait LineHandler: Send {
    /// Nome usado nos logs de erro.
    fn name(&self) -> &str;

    fn handle(&mut self, received: &ReceivedLine<'_>) -> Result<(), HandlerError>;
}

/// Handler a partir de uma closure.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: FnMut(&ReceivedLine<'_>) -> Result<(), HandlerError> + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> LineHandler for FnHandler<F>
where
    F: FnMut(&ReceivedLine<'_>) -> Result<(), HandlerError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&mut self, received: &ReceivedLine<'_>) -> Result<(), HandlerError> {
        (self.f)(received)
    }
}

/// Sinal de parada compartilhável entre threads.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Loop de recepção sobre um [`Transport`].
pub struct Receiver<T: Transport> {
    transport: T,
    config: ReceiverConfig,
    handlers: Vec<Box<dyn LineHandler>>,
    state: ReceiverState,
    stop: StopHandle,
    last_receive: Option<Instant>,
}

impl<T: Transport> Receiver<T> {
    pub fn new(transport: T, config: ReceiverConfig) -> Self {
        Self {
            transport,
            config,
            handlers: Vec::new(),
            state: ReceiverState::Disconnected,
            stop: StopHandle::default(),
            last_receive: None,
        }
    }

    /// Registra um handler. Handlers são chamados na ordem de registro.
    pub fn add_handler(&mut self, handler: impl LineHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Executa o loop até `stop()` ou até um erro sem reconexão.
    pub fn run(&mut self) -> ReceiverState {
        info!("Receiver iniciado em {}", self.transport.target());

        while !self.stop.is_stopped() && self.state != ReceiverState::Stopped {
            if let Err(e) = self.step() {
                self.on_transport_error(e);
            }
        }

        self.state = ReceiverState::Stopped;
        info!("Receiver encerrado em {}", self.transport.target());
        self.state
    }

    /// Roda o loop numa thread dedicada.
    ///
    /// `on_exit` é chamado na própria thread com o estado final.
    pub fn spawn<F>(mut self, name: &str, on_exit: F) -> std::io::Result<ReceiverThread>
    where
        T: 'static,
        F: FnOnce(ReceiverState) + Send + 'static,
    {
        let stop = self.stop_handle();
        let handle = std::thread::Builder::new().name(name.into()).spawn(move || {
            let state = self.run();
            on_exit(state);
            state
        })?;
        Ok(ReceiverThread { handle, stop })
    }

    fn step(&mut self) -> Result<(), TransportError> {
        if self.state == ReceiverState::Disconnected {
            self.transport.initialize()?;
            self.state = ReceiverState::Connected;
            info!("Conectado em {}", self.transport.target());
        }

        if let Some(chunk) = self.transport.receive()? {
            let now = Instant::now();
            let elapsed = self.last_receive.map(|t| now.duration_since(t));
            self.last_receive = Some(now);
            self.dispatch(&chunk, elapsed);
        }
        Ok(())
    }

    fn on_transport_error(&mut self, err: TransportError) {
        error!("Erro: {err}");
        self.transport.close();

        match self.config.reconnect_delay {
            Some(delay) => {
                warn!("Reiniciando em {:.1}s", delay.as_secs_f64());
                self.state = ReceiverState::Disconnected;
                self.sleep(delay);
            }
            None => {
                self.state = ReceiverState::Stopped;
            }
        }
    }

    /// Dorme em fatias para que `stop()` seja atendido durante a espera.
    fn sleep(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        loop {
            let now = Instant::now();
            if now >= deadline || self.stop.is_stopped() {
                return;
            }
            std::thread::sleep((deadline - now).min(STOP_POLL));
        }
    }

    fn dispatch(&mut self, chunk: &Chunk, elapsed: Option<Duration>) {
        for line in chunk.data.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                continue;
            }

            let received = ReceivedLine {
                source: &chunk.source,
                line,
                elapsed,
            };
            for handler in &mut self.handlers {
                let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(&received)));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("Handler '{}' falhou: {e}", handler.name()),
                    Err(_) => error!("Handler '{}' entrou em pânico", handler.name()),
                }
            }
            debug!("Linha de {} entregue a {} handlers", chunk.source, self.handlers.len());
        }
    }
}

/// Receiver rodando em thread própria.
pub struct ReceiverThread {
    handle: JoinHandle<ReceiverState>,
    stop: StopHandle,
}

impl ReceiverThread {
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Aguarda o fim da thread e devolve o estado final.
    pub fn join(self) -> ReceiverState {
        self.handle.join().unwrap_or(ReceiverState::Stopped)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
