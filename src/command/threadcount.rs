///////////////////////////////
/// Number of samples to process at once. Unset means the default; never more workers than samples
pub fn determine_worker_count(
    requested: Option<usize>,
    default: usize,
    num_samples: usize,
) -> anyhow::Result<usize> {
    let workers = some_min1(requested.or(Some(default)))?;
    Ok(min1(workers.min(num_samples)))
}

pub fn some_min1(t: Option<usize>) -> anyhow::Result<usize> {
    if let Some(t) = t {
        if t < 1 {
            anyhow::bail!("Cannot set number of workers to less than 1")
        } else {
            anyhow::Ok(t)
        }
    } else {
        anyhow::Ok(1)
    }
}

pub fn min1(t: usize) -> usize {
    if t < 1 {
        1
    } else {
        t
    }
}
