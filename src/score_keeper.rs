//! One score keeper per live network: buffers the latest value seen on each
//! output hook and turns that buffer into a score via the caller's fitness
//! function.

use std::collections::HashMap;

use cortexevo_rt::{spawn_actor, ActorHandle, Reply};
use cortexevo_utils::FunctionId;
use log::trace;

use crate::tables::{FitnessFn, GenerationDirective, NetworkId};

enum ScoreKeeperMessage {
    Gather {
        output_hook_id: FunctionId,
        value: f64,
        reply: Reply<()>,
    },
    GetScore { reply: Reply<(f64, GenerationDirective)> },
    KillScoreKeeper { reply: Reply<()> },
}

/// A handle to a live score keeper actor.
pub struct ScoreKeeper {
    handle: ActorHandle<ScoreKeeperMessage>,
}

impl ScoreKeeper {
    /// Spawns a score keeper for `network_id`, scoring with `fitness` on
    /// every `get_score` call.
    pub fn spawn(network_id: NetworkId, fitness: FitnessFn) -> Self {
        let mut buffer: HashMap<FunctionId, f64> = HashMap::new();

        let handle = spawn_actor(move |message: ScoreKeeperMessage| -> bool {
            match message {
                ScoreKeeperMessage::Gather {
                    output_hook_id,
                    value,
                    reply,
                } => {
                    trace!("network {network_id} score keeper gathered hook {output_hook_id} = {value}");
                    buffer.insert(output_hook_id, value);
                    reply.send(());
                    true
                }
                ScoreKeeperMessage::GetScore { reply } => {
                    let (score, directive) = fitness(network_id, &buffer);
                    buffer.clear();
                    reply.send((score, directive));
                    true
                }
                ScoreKeeperMessage::KillScoreKeeper { reply } => {
                    reply.send(());
                    false
                }
            }
        });

        Self { handle }
    }

    /// Builds a bound closure to hand to the cortex as an actuator's output
    /// hook: `(NetworkId, f64) -> ()` that posts a `Gather` and waits for it
    /// to be applied before returning, so ordering between successive
    /// actuator firings on the same hook id is preserved.
    pub fn gather_hook(&self) -> impl Fn(FunctionId, f64) + Send + Sync + 'static {
        let mailbox = self.handle.mailbox();
        move |output_hook_id, value| {
            let (reply, waiter) = Reply::new();
            mailbox.post(ScoreKeeperMessage::Gather {
                output_hook_id,
                value,
                reply,
            });
            waiter.wait_forever();
        }
    }

    /// Requests the current score and clears the buffer.
    pub fn get_score(&self) -> (f64, GenerationDirective) {
        let (reply, waiter) = Reply::new();
        self.handle.post(ScoreKeeperMessage::GetScore { reply });
        waiter
            .wait_forever()
            .expect("score keeper mailbox disconnected before replying")
    }

    /// Terminates the score keeper, consuming the handle.
    pub fn kill(self) {
        let (reply, waiter) = Reply::new();
        self.handle.post(ScoreKeeperMessage::KillScoreKeeper { reply });
        waiter.wait_forever();
        self.handle.join();
    }
}
