//! End-to-end scenarios for the scan engine, run against scripted collaborators.
//! Nothing here touches the network or needs nmap installed.

#[cfg(test)]
mod support;

#[cfg(test)]
mod scan;
