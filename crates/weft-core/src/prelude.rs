pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::dispose::{Disposable, Dispose, Resource, Unsubscribe, disposable};
pub use crate::effect::{Effect, EffectOptions, effect};
pub use crate::error::{Error, Result};
pub use crate::events::{Event, Events};
pub use crate::manager::{Manager, UniqueKey};
pub use crate::shape::{Shape, Struct};
pub use crate::source::{Gettable, Subscribable, Tracker};
pub use crate::state::{Merge, State, StateEvent, StateOptions, StateTopic};
pub use crate::timers::Timers;
