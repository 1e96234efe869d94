use crate::{
    classify, Configuration, ControllerState, Decision, Disposition, DownloadCandidate, Effect,
    JobOrigin, Msg,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// For an accepted download the cancel effect always precedes the route
/// effect, and a download already seen never produces effects again.
pub fn update(
    mut state: ControllerState,
    config: &Configuration,
    msg: Msg,
) -> (ControllerState, Vec<Effect>) {
    let effects = match msg {
        Msg::DownloadCreated(event) => {
            if state.has_seen(event.id) {
                return (state, Vec::new());
            }
            let candidate = DownloadCandidate::from_host_event(&event);
            match classify(&candidate, config) {
                Decision::Reject(_) => {
                    state.mark(event.id, Disposition::Passthrough);
                    Vec::new()
                }
                Decision::Accept => {
                    state.mark(event.id, Disposition::Canceled);
                    vec![
                        Effect::CancelHostDownload { id: event.id },
                        Effect::Route {
                            origin: JobOrigin::Intercepted(event.id),
                            job: candidate.to_job(),
                        },
                    ]
                }
            }
        }
        Msg::RouteFinished { origin, outcome } => {
            if let JobOrigin::Intercepted(id) = origin {
                state.attach_outcome(id, outcome);
            }
            Vec::new()
        }
        Msg::JobsRequested(jobs) => {
            if !config.enabled {
                return (state, Vec::new());
            }
            jobs.into_iter()
                .map(|job| Effect::Route {
                    origin: JobOrigin::UserAction,
                    job,
                })
                .collect()
        }
        Msg::PageScanned(jobs) => jobs
            .into_iter()
            .map(|job| Effect::Route {
                origin: JobOrigin::PageScan,
                job,
            })
            .collect(),
    };

    (state, effects)
}
