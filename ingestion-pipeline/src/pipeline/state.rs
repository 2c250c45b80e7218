use state_machines::state_machine;

state_machine! {
    name: VideoMachine,
    state: VideoState,
    initial: New,
    states: [New, Transcribed, Tagged, Embedded, Stored, Aborted],
    events {
        transcribe { transition: { from: New, to: Transcribed } }
        tag { transition: { from: Transcribed, to: Tagged } }
        embed { transition: { from: Tagged, to: Embedded } }
        store { transition: { from: Embedded, to: Stored } }
        abort {
            transition: { from: New, to: Aborted }
            transition: { from: Transcribed, to: Aborted }
            transition: { from: Tagged, to: Aborted }
            transition: { from: Embedded, to: Aborted }
        }
    }
}

pub fn ready() -> VideoMachine<(), New> {
    VideoMachine::new(())
}
