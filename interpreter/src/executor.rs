use std::fmt;
use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::time::Duration;

use botblocks::{Block, BlockKind, Category, Param, WheelMotion};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::CommandChannel;
use crate::command::{ActuatorTarget, Command, Twist};
use crate::safety::is_risky_transition;
use crate::timing::Timing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Cancelled => "cancelled",
        })
    }
}

/// What a run did, returned when it finishes or stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub commands_published: usize,
    pub leaves_executed: usize,
    /// Safety interlock delays inserted before risky wheel transitions.
    pub interlocks: usize,
    /// Commands handed to the channel while it reported itself disconnected.
    pub published_while_disconnected: usize,
}

impl RunReport {
    fn new() -> Self {
        RunReport {
            outcome: RunOutcome::Completed,
            commands_published: 0,
            leaves_executed: 0,
            interlocks: 0,
            published_while_disconnected: 0,
        }
    }
}

type Step<'b> = Pin<Box<dyn Future<Output = ControlFlow<()>> + Send + 'b>>;

/// State owned by one run: the cancellation token, the previously executed
/// leaf for the safety policy, and the channel commands go to.
pub struct ExecutionContext<'a> {
    channel: &'a dyn CommandChannel,
    timing: &'a Timing,
    token: CancellationToken,
    previous_leaf: Option<Block>,
    report: RunReport,
}

/// Run `blocks` in document order until done or cancelled.
///
/// Connectivity is not checked here; [`crate::Interpreter::run`] does that
/// before a run starts.
pub async fn execute_program(
    blocks: &[Block],
    channel: &dyn CommandChannel,
    timing: &Timing,
    token: CancellationToken,
) -> RunReport {
    ExecutionContext::new(channel, timing, token)
        .run(blocks)
        .await
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        channel: &'a dyn CommandChannel,
        timing: &'a Timing,
        token: CancellationToken,
    ) -> Self {
        ExecutionContext {
            channel,
            timing,
            token,
            previous_leaf: None,
            report: RunReport::new(),
        }
    }

    pub async fn run(mut self, blocks: &[Block]) -> RunReport {
        for block in blocks {
            if self.is_cancelled() || self.execute_block(block).await.is_break() {
                self.report.outcome = RunOutcome::Cancelled;
                break;
            }
        }
        self.report
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    async fn execute_block(&mut self, block: &Block) -> ControlFlow<()> {
        if block.is_container() {
            self.execute_repeat(block).await
        } else {
            self.execute_leaf(block).await;
            ControlFlow::Continue(())
        }
    }

    // Boxed so that nested repeats can recurse through execute_block.
    fn execute_repeat<'b>(&'b mut self, block: &'b Block) -> Step<'b> {
        Box::pin(async move {
            let times = block.param(Param::Times) as u32;
            for iteration in 0..times {
                if self.is_cancelled() {
                    return ControlFlow::Break(());
                }
                debug!(iteration = iteration + 1, times, "repeat iteration");
                for child in block.children() {
                    if self.is_cancelled() {
                        return ControlFlow::Break(());
                    }
                    if self.execute_block(child).await.is_break() {
                        return ControlFlow::Break(());
                    }
                    if child.category() == Category::Arm {
                        sleep(self.timing.arm_settle()).await;
                    }
                }
                if iteration + 1 < times {
                    sleep(self.timing.repeat_pause()).await;
                }
            }
            ControlFlow::Continue(())
        })
    }

    async fn execute_leaf(&mut self, block: &Block) {
        let kind = block.kind();
        if block.category() == Category::Wheel
            && is_risky_transition(self.previous_leaf.as_ref(), Some(block))
        {
            info!(
                previous = ?self.previous_leaf.as_ref().map(Block::kind),
                current = %kind,
                "risky transition, waiting for safety interlock"
            );
            self.report.interlocks += 1;
            sleep(self.timing.safety_interlock()).await;
        }

        match kind.wheel_motion() {
            Some(motion) if motion.is_angular() => {
                self.turn(motion, block.param(Param::Angle)).await
            }
            Some(motion) => {
                self.drive(
                    motion,
                    block.param(Param::Speed),
                    block.param(Param::Duration),
                )
                .await
            }
            None if block.category() == Category::Arm => self.gesture(kind).await,
            None => self.pause(block.param(Param::Seconds)).await,
        }

        self.previous_leaf = Some(block.clone());
        self.report.leaves_executed += 1;
    }

    async fn gesture(&mut self, kind: BlockKind) {
        self.publish(ActuatorTarget::Arm, Command::gesture(kind.name()));
        sleep(self.timing.arm_actuation()).await;
    }

    /// Sweep `angle` degrees: velocity every tick, then halt and settle.
    async fn turn(&mut self, motion: WheelMotion, angle: f64) {
        let duration = self.timing.turn_duration(angle);
        let rate = match motion {
            WheelMotion::TurnRight => -self.timing.angular_speed,
            _ => self.timing.angular_speed,
        };
        let tick = self.timing.tick();
        let ticks = self.timing.sweep_ticks(duration);
        debug!(angle, ?duration, ticks, "turning");

        for _ in 0..ticks {
            self.publish(ActuatorTarget::Drive, Command::Drive(Twist::angular(rate)));
            sleep(tick).await;
        }
        self.publish(ActuatorTarget::Drive, Command::Drive(Twist::stop()));
        sleep(duration + tick).await;
    }

    async fn drive(&mut self, motion: WheelMotion, speed: f64, seconds: f64) {
        let velocity = match motion {
            WheelMotion::Backward => -speed,
            _ => speed,
        };
        debug!(velocity, seconds, "driving");
        self.publish(ActuatorTarget::Drive, Command::Drive(Twist::linear(velocity)));
        sleep(Duration::from_secs_f64(seconds)).await;
        self.publish(ActuatorTarget::Drive, Command::Drive(Twist::stop()));
    }

    async fn pause(&mut self, seconds: f64) {
        debug!(seconds, "pausing");
        sleep(Duration::from_millis((seconds * 1000.0) as u64)).await;
    }

    fn publish(&mut self, target: ActuatorTarget, command: Command) {
        if !self.channel.is_connected() {
            // Still published: the transport decides whether to accept it.
            warn!(%target, %command, "publishing to a disconnected channel");
            self.report.published_while_disconnected += 1;
        }
        debug!(%target, %command, "publish");
        self.channel.publish(target, command);
        self.report.commands_published += 1;
    }
}
