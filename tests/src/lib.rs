#[cfg(test)]
mod utils;

#[cfg(test)]
mod pipeline {
    mod integration;
}

#[cfg(test)]
mod runner {
    mod integration;
}
